use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use baglink_frame::Command;
use baglink_telemetry::SENSOR_FAULT_SENTINEL;
use baglink_transport::{LinkStream, LocalEndpoint};

use crate::cmd::{parse_duration, SimulateArgs};
use crate::exit::{io_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::OutputFormat;

/// How often the simulator polls the link for command bytes.
const COMMAND_POLL: Duration = Duration::from_millis(50);

pub fn run(args: SimulateArgs, _format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;

    let listener =
        LocalEndpoint::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    info!(path = %args.path.display(), bag_id = %args.bag_id, "simulated bag ready");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let stream = match listener.accept() {
            Ok(stream) => stream,
            Err(baglink_transport::TransportError::Accept(err))
                if err.kind() == ErrorKind::Interrupted =>
            {
                continue;
            }
            Err(err) => return Err(transport_error("accept failed", err)),
        };
        serve_connection(stream, &args.bag_id, interval, args.frames, &running)?;
    }

    Ok(SUCCESS)
}

fn serve_connection(
    mut stream: LinkStream,
    bag_id: &str,
    interval: Duration,
    frames: Option<u64>,
    running: &AtomicBool,
) -> CliResult<()> {
    stream
        .set_read_timeout(Some(COMMAND_POLL))
        .map_err(|err| transport_error("timeout setup failed", err))?;

    if write_frame(&mut stream, &format!("ID:{bag_id}\n"))?.is_none() {
        return Ok(());
    }
    info!("monitor connected; streaming telemetry");

    let mut device = DeviceState::new();
    let mut sent = 0u64;
    // Emit the first frame immediately.
    let mut last_emit = Instant::now() - interval;

    loop {
        if !running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if frames.is_some_and(|limit| sent >= limit) {
            info!(sent, "frame limit reached; closing connection");
            return Ok(());
        }

        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(0) => {
                info!("monitor disconnected");
                return Ok(());
            }
            Ok(_) => match Command::from_wire(byte[0]) {
                Some(command) => {
                    device.apply(command);
                    info!(%command, "actuator switched");
                }
                None => warn!(byte = byte[0], "unknown command byte"),
            },
            Err(err)
                if err.kind() == ErrorKind::WouldBlock
                    || err.kind() == ErrorKind::TimedOut
                    || err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(io_error("link read failed", err)),
        }

        if last_emit.elapsed() >= interval {
            let frame = device.next_frame();
            debug!(frame = frame.trim_end(), "emitting telemetry");
            if write_frame(&mut stream, &frame)?.is_none() {
                return Ok(());
            }
            last_emit = Instant::now();
            sent += 1;
        }
    }
}

/// `Ok(None)` means the peer went away; other write failures are errors.
fn write_frame(stream: &mut LinkStream, frame: &str) -> CliResult<Option<()>> {
    match stream.write_all(frame.as_bytes()).and_then(|()| stream.flush()) {
        Ok(()) => Ok(Some(())),
        Err(err)
            if err.kind() == ErrorKind::BrokenPipe
                || err.kind() == ErrorKind::ConnectionReset =>
        {
            info!("monitor disconnected");
            Ok(None)
        }
        Err(err) => Err(io_error("link write failed", err)),
    }
}

/// Scripted device model: actuators drive thermal drift and battery drain.
///
/// Numbers are formatted with `format!`: fixed decimal point regardless of
/// the process locale, exactly like the real firmware.
struct DeviceState {
    heat: bool,
    cool: bool,
    light: bool,
    battery: f32,
    hot_c: f32,
    cold_c: f32,
    tick: u64,
}

impl DeviceState {
    fn new() -> Self {
        Self {
            heat: false,
            cool: false,
            light: false,
            battery: 100.0,
            hot_c: 22.0,
            cold_c: 18.0,
            tick: 0,
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::HeatOn => self.heat = true,
            Command::HeatOff => self.heat = false,
            Command::CoolOn => self.cool = true,
            Command::CoolOff => self.cool = false,
            Command::LightOn => self.light = true,
            Command::LightOff => self.light = false,
        }
    }

    fn active_functions(&self) -> u8 {
        u8::from(self.heat) + u8::from(self.cool) + u8::from(self.light)
    }

    fn next_frame(&mut self) -> String {
        self.tick += 1;

        let hot_target = if self.heat { 65.0 } else { 22.0 };
        self.hot_c += (hot_target - self.hot_c) * 0.05;
        let cold_target = if self.cool { 3.0 } else { 18.0 };
        self.cold_c += (cold_target - self.cold_c) * 0.05;

        let drain = 0.02 + 0.05 * f32::from(self.active_functions());
        self.battery = (self.battery - drain).max(0.0);

        let shake = (self.tick as f32 * 0.7).sin() * 0.2;

        // The hot sensor drops out periodically to exercise fault handling.
        let hot_field = if self.tick % 97 == 0 {
            SENSOR_FAULT_SENTINEL.to_string()
        } else {
            format!("{:.2}", self.hot_c)
        };

        format!(
            "{},{},{:.2},1,{},{:.2}\n",
            self.battery as i64,
            hot_field,
            self.cold_c,
            self.active_functions(),
            shake
        )
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitted_frames_parse_as_telemetry() {
        let mut device = DeviceState::new();
        for _ in 0..50 {
            let frame = device.next_frame();
            let snapshot = baglink_telemetry::parse(frame.trim_end()).unwrap();
            assert!(snapshot.battery_percent <= 100);
            assert!(snapshot.active_functions <= 3);
        }
    }

    #[test]
    fn heat_command_raises_hot_compartment() {
        let mut device = DeviceState::new();
        device.apply(Command::HeatOn);
        let before = device.hot_c;
        for _ in 0..20 {
            device.next_frame();
        }
        assert!(device.hot_c > before);
        assert_eq!(device.active_functions(), 1);
    }

    #[test]
    fn hot_sensor_faults_periodically() {
        let mut device = DeviceState::new();
        let mut saw_fault = false;
        for _ in 0..100 {
            let frame = device.next_frame();
            let snapshot = baglink_telemetry::parse(frame.trim_end()).unwrap();
            saw_fault |= snapshot.hot_temp_c.is_fault();
        }
        assert!(saw_fault);
    }
}
