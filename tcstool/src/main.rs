use clap::Parser;

mod common;
mod console;
mod send;
mod simulate;

trait ToolRun {
    fn run(&self) -> anyhow::Result<()>;
}

/// A host-side tool for the serial color sensor node.
#[derive(Parser, Debug)]
#[command(version)]
enum Tool {
    /// Send one command and wait for the reply.
    Send(send::SendOpts),
    /// Decode and print everything arriving on the link.
    Console(console::ConsoleOpts),
    /// Serve a simulated sensor node over TCP.
    Simulate(simulate::SimulateOpts),
}

impl ToolRun for Tool {
    fn run(&self) -> anyhow::Result<()> {
        match self {
            Tool::Send(o) => o.run(),
            Tool::Console(o) => o.run(),
            Tool::Simulate(o) => o.run(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    Tool::parse().run()
}
