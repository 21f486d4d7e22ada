//! # oracle
//!
//! Command line front end for the attack oracle. It can serve the
//! behavioural device model over XVC, and talk to any XVC server (or an
//! in-process model) to identify the device, load a position and enumerate
//! attacks.
use std::error::Error;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use env_logger::Env;
use oracle_client::{Builder, Session, link::xvc::XvcLink};
use oracle_protocol::{Colour, IDCODE, Link, Piece, Square, error::DecodeError};
use oracle_server::server;
use oracle_sim::SimLink;

/// One `square=piece` assignment, with `.` for an empty square.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Placement {
    square: Square,
    piece: Option<Piece>,
}

impl FromStr for Placement {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (square, piece) = s
            .split_once('=')
            .ok_or_else(|| DecodeError::InvalidPieceName(s.to_string()))?;
        let piece = match piece {
            "." => None,
            piece => Some(piece.parse()?),
        };
        Ok(Placement {
            square: square.parse()?,
            piece,
        })
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.piece {
            Some(piece) => write!(f, "{}={}", self.square, piece),
            None => write!(f, "{}=.", self.square),
        }
    }
}

#[derive(Subcommand, Debug, Eq, PartialEq, Clone)]
enum Command {
    /// Serve the device model over XVC
    Serve {
        #[arg(
            short,
            long,
            help = "Largest shift vector accepted, in bytes",
            default_value = "10485760"
        )]
        max_vector_size: u32,
        #[arg(long, help = "Socket timeout in seconds", default_value = "30")]
        timeout_s: u64,
    },
    /// Reset the TAP and print the IDCODE
    Idcode,
    /// Place pieces, e.g. `d4=K e5=p a1=.`
    Place {
        #[arg(required = true)]
        placements: Vec<Placement>,
    },
    /// Empty the given squares
    Clear {
        #[arg(required = true)]
        squares: Vec<Square>,
    },
    /// Set the side whose pieces attack
    Side { colour: Colour },
    /// Print the readable registers
    Registers,
    /// List every (victim, aggressor) pair
    Enumerate {
        #[arg(short, long, help = "Place pieces before enumerating")]
        place: Vec<Placement>,
        #[arg(short, long, help = "Set the side to move before enumerating")]
        side: Option<Colour>,
        #[arg(long, help = "Print victims only, one per attack")]
        victims: bool,
    },
}

#[derive(Parser)]
#[command(about = "Attack oracle JTAG client and device model server", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "2542", global = true)]
    port: u16,

    #[arg(short, long, default_value = "127.0.0.1", global = true)]
    ip: IpAddr,

    #[arg(long, help = "Use an in-process device model instead of XVC", global = true)]
    sim: bool,

    #[arg(long, value_parser = maybe_hex::<u32>, default_value_t = IDCODE, global = true)]
    expected_idcode: u32,

    #[arg(long, help = "Upper bound on victims and on aggressors per victim", default_value = "64", global = true)]
    limit: u32,

    #[arg(long, help = "Request a TCK period in nanoseconds", global = true)]
    tck_ns: Option<u32>,

    #[clap(subcommand)]
    command: Command,
}

fn open(args: &Args) -> Result<Session<Box<dyn Link>>, Box<dyn Error>> {
    let mut link: Box<dyn Link> = if args.sim {
        log::info!("Using in-process device model");
        Box::new(SimLink::new())
    } else {
        let addr = SocketAddr::new(args.ip, args.port);
        log::info!("Connecting to {}", addr);
        Box::new(XvcLink::connect(addr)?)
    };
    if let Some(period_ns) = args.tck_ns {
        let applied = link.set_tck(period_ns)?;
        log::info!("TCK period {} ns (requested {} ns)", applied, period_ns);
    }
    let session = Builder::new()
        .expected_idcode(args.expected_idcode)
        .limit(args.limit)
        .open(link)?;
    Ok(session)
}

fn place(session: &mut Session<Box<dyn Link>>, placements: &[Placement]) -> Result<(), Box<dyn Error>> {
    for placement in placements {
        log::debug!("Placing {}", placement);
        session.set_piece(placement.square, placement.piece)?;
    }
    Ok(())
}

fn print_registers(session: &mut Session<Box<dyn Link>>) -> Result<(), Box<dyn Error>> {
    let registers = session.registers();
    println!("idcode        {:#010x}", registers.idcode()?);
    println!("side to move  {}", registers.side_to_move()?);
    println!("mask mode     {:?}", registers.mask_mode()?);
    println!("state mode    {:?}", registers.state_mode()?);
    println!("write bus     {:#x}", registers.write_bus()?);
    match registers.first_square()? {
        Some(square) => println!("first square  {}", square),
        None => println!("first square  (invalid)"),
    }
    println!("second valid  {}", registers.second_valid()?);
    Ok(())
}

fn serve(args: &Args, max_vector_size: u32, timeout_s: u64) -> Result<(), Box<dyn Error>> {
    let addr = SocketAddr::new(args.ip, args.port);
    log::info!("Binding to address: {}", addr);
    let mut server = server::Builder::new()
        .max_vector_size(max_vector_size)
        .rw_timeout(Duration::from_secs(timeout_s))
        .build(SimLink::new());
    server.listen(addr)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Parsed arguments: ip={}, port={}", args.ip, args.port);

    match &args.command {
        Command::Serve {
            max_vector_size,
            timeout_s,
        } => serve(&args, *max_vector_size, *timeout_s)?,
        Command::Idcode => {
            let mut session = open(&args)?;
            println!("{:#010x}", session.registers().idcode()?);
        }
        Command::Place { placements } => {
            let mut session = open(&args)?;
            place(&mut session, placements)?;
        }
        Command::Clear { squares } => {
            let mut session = open(&args)?;
            for square in squares {
                session.registers().clear_square(*square)?;
            }
        }
        Command::Side { colour } => {
            let mut session = open(&args)?;
            session.set_side_to_move(*colour)?;
        }
        Command::Registers => {
            let mut session = open(&args)?;
            print_registers(&mut session)?;
        }
        Command::Enumerate {
            place: placements,
            side,
            victims,
        } => {
            let mut session = open(&args)?;
            place(&mut session, placements)?;
            if let Some(colour) = side {
                session.set_side_to_move(*colour)?;
            }
            if *victims {
                for victim in session.enumerate()? {
                    println!("{}", victim);
                }
            } else {
                let attacks = session.attack_list()?;
                for attack in &attacks {
                    println!("{} <- {}", attack.victim, attack.aggressor);
                }
                log::info!("{} attacks", attacks.len());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn placements_parse() {
        let placement: Placement = "d4=K".parse().unwrap();
        assert_eq!(placement.square, "d4".parse().unwrap());
        assert_eq!(placement.to_string(), "d4=K");
        let empty: Placement = "h8=.".parse().unwrap();
        assert_eq!(empty.piece, None);
        assert!("d4K".parse::<Placement>().is_err());
        assert!("z9=K".parse::<Placement>().is_err());
    }

    #[test]
    fn enumerate_in_process() {
        let args = Args::parse_from([
            "oracle",
            "--sim",
            "enumerate",
            "--place",
            "d4=K",
            "--side",
            "white",
        ]);
        assert!(args.sim);
        let mut session = open(&args).unwrap();
        if let Command::Enumerate { place: p, side, .. } = &args.command {
            place(&mut session, p).unwrap();
            session.set_side_to_move(side.unwrap()).unwrap();
        }
        assert_eq!(session.enumerate().unwrap().len(), 8);
    }

    #[test]
    fn hex_idcode_option() {
        let args = Args::parse_from(["oracle", "--expected-idcode", "0xdeadbeef", "idcode"]);
        assert_eq!(args.expected_idcode, 0xdead_beef);
        assert_eq!(args.command, Command::Idcode);
    }
}
