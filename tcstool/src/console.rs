use tcslib::protocol::FrameError;
use tcslib::{LinkError, LinkRead, LinkStd};

#[derive(clap::Args, Debug)]
pub struct ConsoleOpts {
    #[command(flatten)]
    port: crate::common::SerialPortArgs,

    /// The link address to listen as.
    #[arg(long, default_value = "AAA")]
    from: String,

    /// Also print traffic addressed to other devices.
    #[arg(short, long)]
    all: bool,
}

impl crate::ToolRun for ConsoleOpts {
    fn run(&self) -> anyhow::Result<()> {
        let from = crate::common::parse_address(&self.from)?;
        let port = self.port.open()?;
        let mut link = LinkStd::new_std(from, port);

        loop {
            match link.read_reply() {
                Ok(LinkRead::Frame(raw)) => {
                    crate::send::print_reply(raw.sender, raw.frame_id, raw.data());
                }
                Ok(LinkRead::Bad(FrameError::WrongRecipient)) if !self.all => {}
                Ok(LinkRead::Bad(e)) => {
                    println!("!!! bad frame: {:?}", e);
                }
                Ok(LinkRead::Pending) => {}
                Err(LinkError::Io(ref e)) if crate::common::is_timeout(e) => {
                    // time-outs are ok
                }
                Err(e) => anyhow::bail!(e),
            }
        }
    }
}
