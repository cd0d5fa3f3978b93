use tcslib::protocol::Address;
use tcslib::{LinkError, LinkRead, LinkStd};
use tcsnode::hw::{LedPin, SampleTimer};
use tcsnode::sensor::{reg, SensorBus, AUTO_INCREMENT, COMMAND_BIT, EXPECTED_ID};
use tcsnode::Node;

#[derive(clap::Args, Debug)]
pub struct SimulateOpts {
    #[arg(default_value = "localhost:8855")]
    bind: String,
}

/// A bus that parks each read request until the simulator loop
/// synthesizes its completion.
#[derive(Debug, Default)]
struct SimBus {
    pending: Option<(u8, usize)>,
}

impl SimBus {
    fn take_request(&mut self) -> Option<(u8, usize)> {
        self.pending.take()
    }
}

impl SensorBus for SimBus {
    type Error = core::convert::Infallible;

    fn is_idle(&mut self) -> bool {
        self.pending.is_none()
    }

    fn write_register(&mut self, _register: u8, _value: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn start_read(&mut self, register: u8, len: usize) -> Result<(), Self::Error> {
        self.pending = Some((register, len));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SimLed {
    on: bool,
}

impl LedPin for SimLed {
    fn set_on(&mut self, on: bool) {
        self.on = on;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

#[derive(Debug)]
struct SimTimer {
    running: bool,
    period_ms: u32,
}

impl Default for SimTimer {
    fn default() -> Self {
        Self {
            running: false,
            period_ms: 1000,
        }
    }
}

impl SampleTimer for SimTimer {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn set_period_ms(&mut self, period_ms: u32) {
        self.period_ms = period_ms;
    }
}

type SimNode = Node<SimBus, SimLed, SimTimer>;

impl crate::ToolRun for SimulateOpts {
    fn run(&self) -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind(&self.bind)?;
        eprintln!("Listening on {}.", self.bind);

        // the node and its archive outlive individual connections
        let started = std::time::Instant::now();
        let mut node = SimNode::new(SimBus::default(), SimLed::default(), SimTimer::default());
        let mut last_tick = 0;

        loop {
            let (stream, addr) = listener.accept()?;
            eprintln!("Connected to {}.", addr);

            // a short timeout, so the sampling clock keeps moving
            // between frames
            stream.set_read_timeout(Some(std::time::Duration::from_millis(50)))?;

            let sim = Simulator {
                link: LinkStd::new_std(Address::DEVICE, stream),
                node: &mut node,
                started,
                last_tick: &mut last_tick,
            };
            match sim.simulate() {
                Err(e) => match e.downcast_ref::<LinkError<std::io::Error>>() {
                    // an expected error, at disconnect
                    Some(LinkError::UnexpectedEof) => {
                        eprintln!("Disconnected from {}.", addr);
                        continue;
                    }
                    // any other error is unexpected
                    _ => anyhow::bail!(e),
                },
                // statically impossible, but ! not stable
                _ => {}
            }
        }
    }
}

struct Simulator<'a> {
    link: LinkStd<std::net::TcpStream>,
    node: &'a mut SimNode,
    started: std::time::Instant,
    last_tick: &'a mut u32,
}

impl Simulator<'_> {
    fn now_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    fn simulate(mut self) -> anyhow::Result<()> {
        loop {
            let now = self.now_ms();
            self.node.poll(now);
            self.tick(now);
            self.service_bus(now);

            match self.link.read_command() {
                Ok(LinkRead::Frame(frame)) => {
                    let reply = self.node.execute(&frame, self.now_ms());
                    self.link.write(&reply)?;
                }
                Ok(LinkRead::Bad(e)) => {
                    if let Some(reply) = e.reply(Address::DEVICE) {
                        self.link.write(&reply)?;
                    }
                }
                Ok(LinkRead::Pending) => {}
                Err(LinkError::Io(ref e)) if crate::common::is_timeout(e) => {}
                Err(e) => anyhow::bail!(e),
            }
        }
    }

    fn tick(&mut self, now: u32) {
        if !self.node.timer().running {
            *self.last_tick = now;
            return;
        }
        if now.wrapping_sub(*self.last_tick) >= self.node.timer().period_ms {
            *self.last_tick = now;
            self.node.on_timer_tick();
        }
    }

    /// Complete a parked bus read with synthesized register contents.
    fn service_bus(&mut self, now: u32) {
        let Some((register, len)) = self.node.sensor_mut().bus_mut().take_request() else {
            return;
        };

        let mut data = [0u8; 8];
        if register == COMMAND_BIT | reg::ID {
            data[0] = EXPECTED_ID;
        } else if register == COMMAND_BIT | AUTO_INCREMENT | reg::CDATAL {
            // a slow ramp, distinct per channel
            let v = (now / 10) as u16;
            for (i, channel) in [v, v / 2, v / 3, v / 4].into_iter().enumerate() {
                data[2 * i] = (channel & 0xff) as u8;
                data[2 * i + 1] = (channel >> 8) as u8;
            }
        }

        let len = len.min(data.len());
        self.node.on_transfer_complete(&data[..len], now);
    }
}
