//! Train car executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single car of a train:
//!
//!     - Initialise the session, select the car's identity, load the parameters
//!     - Open the network (UDP broadcast, or an in-memory bus with `--sim`)
//!     - Main loop:
//!         - Sensor acquisition
//!         - Message processing by the role agent
//!         - Motion control
//!         - Message sending and motor demands
//!
//! The car's hardware is simulated, the simulation is advanced by the real time elapsed between
//! two cycles.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::{
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use comms_if::{
    msg::{CarId, Role},
    net::{Datagram, LoopbackBus, Transport, UdpBroadcast},
};
use train_lib::{
    agent::RoleAgent,
    car::{Car, CycleStatus},
    crossing::CrossingParams,
    hal::{
        sim::{SimCar, SimTrack},
        CliInput, UserInput,
    },
    motion_ctrl::{FollowPolicy, MotionCtrl, Params},
    params::TrainExecParams,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::{MakeSafe, State},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Runs one car of a train.
#[derive(Debug, StructOpt)]
#[structopt(name = "train_exec")]
struct Opt {
    /// Train number (1 or 2), asked on the terminal if not given
    #[structopt(short, long)]
    train: Option<u8>,

    /// Role of the car (leader, middle or queue), asked on the terminal if not given
    #[structopt(short, long)]
    role: Option<Role>,

    /// Use an in-memory network instead of UDP broadcast, and defaults for missing parameters
    #[structopt(long)]
    sim: bool,

    /// Override the follow policy of the parameters
    #[structopt(long)]
    policy: Option<FollowPolicy>,
}

// ---------------------------------------------------------------------------
// MAIN
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Without a software root the simulation keeps its sessions in the working directory
    let session = match Session::new("train_exec", "sessions") {
        Ok(s) => s,
        Err(_) if opt.sim => Session::in_dir("train_exec", "sessions")
            .wrap_err("Failed to create the session")?,
        Err(e) => return Err(e).wrap_err("Failed to create the session"),
    };

    // ---- IDENTITY ----

    let mut input = CliInput::new(opt.role, opt.train);
    let train = input
        .wait_for_train_selection()
        .wrap_err("Failed to select the train")?;
    let role = input
        .wait_for_role_selection()
        .wrap_err("Failed to select the role")?;
    let car_id = CarId::try_new(train, role).wrap_err("Invalid car identity")?;

    logger_init(LevelFilter::Debug, &session, &car_id.to_string())
        .wrap_err("Failed to initialise logging")?;

    info!("Train Car Executable\n");
    info!("Car: {}", car_id);
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: TrainExecParams = load_params("train_exec.toml", opt.sim)?;
    let cycle_period = params
        .cycle_period()
        .wrap_err("Invalid train_exec.toml")?;
    let crossing_params: CrossingParams = load_params("crossing.toml", opt.sim)?;

    let mut motion_ctrl = MotionCtrl::new(Params::default(), params.follow_policy);
    if let Some(p) = opt.policy {
        motion_ctrl.set_policy(p);
    }
    match motion_ctrl.init("motion_ctrl.toml", &session) {
        Ok(()) => (),
        Err(e) if opt.sim => warn!("{}, using default motion control parameters", e),
        Err(e) => return Err(e).wrap_err("Failed to initialise MotionCtrl"),
    }

    info!("Parameters loaded");

    // ---- MODULE INITIALISATION ----

    let agent = RoleAgent::new(
        car_id,
        motion_ctrl,
        crossing_params,
        params.report_period_s,
    )
    .wrap_err("Failed to create the role agent")?;

    let sim = SimCar::new(SimTrack::default(), sim_start_ticks(role), 0.5);

    // ---- NETWORK AND MAIN LOOP ----

    let result = if opt.sim {
        let bus = LoopbackBus::new();
        let link = bus.attach(Duration::from_millis(params.net.recv_timeout_ms));
        let transport = Transport::new(link, car_id, params.net.redundancy)
            .wrap_err("Failed to create the transport")?;

        info!("Using the in-memory network");
        run(
            Car::new(agent, sim.hardware(), transport).wrap_err("Failed to create the car")?,
            &sim,
            &params,
            cycle_period,
        )
    } else {
        let link = UdpBroadcast::bind(&params.net).wrap_err("Failed to open the UDP socket")?;
        let transport = Transport::new(link, car_id, params.net.redundancy)
            .wrap_err("Failed to create the transport")?;

        info!("Broadcasting on UDP port {}", params.net.port);
        run(
            Car::new(agent, sim.hardware(), transport).wrap_err("Failed to create the car")?,
            &sim,
            &params,
            cycle_period,
        )
    };

    session.exit();

    result
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Cycle the car until it is halted or the hardware keeps failing.
fn run<D: Datagram + 'static>(
    mut car: Car<D>,
    sim: &SimCar,
    params: &TrainExecParams,
    cycle_period: Duration,
) -> Result<(), Report> {
    let mut num_consec_errors = 0u64;
    let mut last_cycle_instant: Option<Instant> = None;

    info!("Initialisation complete, entering main loop");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        if let Some(last) = last_cycle_instant {
            sim.step((cycle_start_instant - last).as_secs_f64());
        }
        last_cycle_instant = Some(cycle_start_instant);

        match car.cycle(session::get_elapsed_seconds()) {
            Ok(CycleStatus::Running) => num_consec_errors = 0,
            Ok(CycleStatus::Halted) => {
                info!("Car halted, exiting");
                break;
            }
            Err(e) => {
                num_consec_errors += 1;
                warn!("Cycle failed: {}", e);

                if num_consec_errors > params.max_consec_hal_errors {
                    error!(
                        "More than {} consecutive cycle errors, making safe",
                        params.max_consec_hal_errors
                    );
                    car.make_safe();
                    return Err(eyre!("Too many consecutive cycle errors, last: {}", e));
                }
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }

    Ok(())
}

/// Load a parameter file, falling back on the defaults when simulating.
fn load_params<P: DeserializeOwned + Default>(file: &str, sim: bool) -> Result<P, Report> {
    match util::params::load(file) {
        Ok(p) => Ok(p),
        Err(e) if sim => {
            warn!("{}, using default parameters", e);
            Ok(P::default())
        }
        Err(e) => Err(e).wrap_err_with(|| format!("Could not load {}", file)),
    }
}

/// Starting point on the simulated circuit, so the train's cars start one behind the other.
fn sim_start_ticks(role: Role) -> f64 {
    match role {
        Role::Leader => 4950.0,
        Role::Middle => 4700.0,
        Role::Queue => 4450.0,
    }
}
