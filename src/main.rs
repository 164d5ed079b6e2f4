use clap::Parser;
use crossbeam::channel;
use mtcsyncrs::{
    cli::{select_device, Args, Command},
    create_scheduler, handle_device_list, logging,
    midi::{DefaultMidiEngine, MidiEngine},
    mtc::{run_mtc_receiver, MtcDecoder, MtcEncoder, MtcGenerator},
    ui::{self, GeneratorStatus, ReceiverStatus},
    FrameRate, Scheduler, Settings, Timecode,
};
use std::sync::Arc;
use std::thread;

fn main() {
    let args = parse_command_line_arguments();
    initialize_logging(args.verbose);

    let mut settings = load_settings(&args);

    match args.command {
        Command::Devices => list_available_devices(&handle_device_list()),
        Command::Generate {
            device,
            rate,
            start,
            locate_behavior,
        } => {
            settings.device = device.or(settings.device);
            settings.frame_rate = rate.or(settings.frame_rate);
            if let Some(behavior) = locate_behavior {
                settings.locate_behavior = behavior;
            }
            run_generate(&settings, &start);
        }
        Command::Receive {
            device,
            rate,
            lock_frames,
            drop_out_frames,
            granularity,
        } => {
            settings.device = device.or(settings.device);
            settings.frame_rate = rate.or(settings.frame_rate);
            settings.lock_frames = lock_frames.unwrap_or(settings.lock_frames);
            settings.drop_out_frames = drop_out_frames.unwrap_or(settings.drop_out_frames);
            settings.display_granularity = granularity.unwrap_or(settings.display_granularity);
            run_receive(&settings);
        }
    }
}

fn parse_command_line_arguments() -> Args {
    Args::parse()
}

fn initialize_logging(verbose: bool) {
    if let Err(e) = logging::init_logger(verbose) {
        eprintln!("Logger initialization failed: {}", e);
    }
    log::info!("Application starting");
}

fn load_settings(args: &Args) -> Settings {
    Settings::load(args.config.as_deref()).unwrap_or_else(|e| exit_with_error(e.to_string()))
}

fn exit_with_error(error_msg: String) -> ! {
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    std::process::exit(1);
}

fn list_available_devices(devices: &[String]) {
    println!("Available MIDI devices:");
    for device in devices {
        println!("  - {}", device);
    }
}

fn choose_device(settings: &Settings) -> String {
    let devices = handle_device_list();
    select_device(settings.device.as_deref(), &devices).unwrap_or_else(|e| exit_with_error(e))
}

fn run_generate(settings: &Settings, start: &str) {
    let frame_rate = settings.frame_rate.unwrap_or(FrameRate::Fps30);
    let start = Timecode::parse(start, frame_rate)
        .unwrap_or_else(|e| exit_with_error(format!("Error: Invalid start position: {}", e)));

    let device_name = choose_device(settings);
    let engine = DefaultMidiEngine::new(None, Some(device_name.clone())).unwrap_or_else(|e| {
        exit_with_error(format!("Error connecting to MIDI device: {}", e))
    });
    log::info!("Successfully connected to MIDI device: {}", device_name);
    println!("Generating MTC on {} from {} @ {}", device_name, start, frame_rate);

    let mut engine = engine;
    let mut encoder = MtcEncoder::new("generator", move |bytes: &[u8]| {
        if let Err(e) = engine.send(bytes) {
            log::error!("Failed to send MTC: {}", e);
        }
    });
    encoder.set_locate_behavior(settings.locate_behavior);

    let scheduler = create_scheduler();
    let generator = MtcGenerator::spawn(&scheduler, encoder)
        .unwrap_or_else(|e| exit_with_error(format!("Error starting generator: {}", e)));
    generator.locate(start);
    generator.start(start);

    let status = Arc::new(GeneratorStatus::default());
    status.running.store(true);
    run_status_until_interrupted(move || {
        ui::format_generator_status(generator.position(), status.running.load())
    });
}

fn run_receive(settings: &Settings) {
    let policy = settings
        .sync_policy()
        .unwrap_or_else(|e| exit_with_error(e.to_string()));

    let device_name = choose_device(settings);
    let engine = DefaultMidiEngine::new(Some(device_name.clone()), None).unwrap_or_else(|e| {
        exit_with_error(format!("Error connecting to MIDI device: {}", e))
    });
    log::info!("Successfully connected to MIDI device: {}", device_name);
    println!("Receiving MTC on {}", device_name);

    let status = Arc::new(ReceiverStatus::default());
    let timecode_status = status.clone();
    let state_status = status.clone();

    let mut decoder = MtcDecoder::new(
        "receiver",
        settings.frame_rate,
        policy,
        move |timecode, _message_type, direction, _display_needs_update| {
            timecode_status.timecode.store(Some(timecode));
            timecode_status.direction.store(direction);
        },
        move |state| state_status.state.store(state),
    );
    decoder.set_display_update_granularity(settings.display_granularity);
    decoder.set_mtc_rate_changed_handler(|rate| log::info!("Incoming MTC rate is {}", rate));

    let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
    let scheduler = create_scheduler();
    let reader_scheduler = create_scheduler();
    if let Err(e) = scheduler.spawn("mtc-receiver", move || {
        run_mtc_receiver(&reader_scheduler, engine, decoder, shutdown_rx);
    }) {
        exit_with_error(format!("Error starting receiver: {}", e));
    }

    run_status_until_interrupted(move || status.render());
    let _ = shutdown_tx.send(());
}

fn run_status_until_interrupted<F>(render: F)
where
    F: Fn() -> String + Send + 'static,
{
    log::info!("Application running. Press Ctrl+C to exit...");
    println!("\nPress Ctrl+C to exit...");

    // never signalled; the process ends on Ctrl+C
    let (_keep_open, shutdown) = channel::bounded::<()>(0);
    let spinner = ui::create_status_spinner("MTC");
    let display = thread::spawn(move || ui::run_status_display(spinner, render, shutdown));
    let _ = display.join();
}
