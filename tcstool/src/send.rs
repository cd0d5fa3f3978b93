use tcslib::protocol::{Address, ReplyData};
use tcslib::{LinkError, LinkRead, LinkStd};

#[derive(clap::Args, Debug)]
pub struct SendOpts {
    /// Decoded command payload, like RDRAW or SETGAIN2.
    command: String,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,

    /// Frame id to send, echoed in the reply.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=99))]
    id: u8,

    /// Our own link address.
    #[arg(long, default_value = "AAA")]
    from: String,
}

impl crate::ToolRun for SendOpts {
    fn run(&self) -> anyhow::Result<()> {
        let from = crate::common::parse_address(&self.from)?;
        let port = self.port.open()?;
        let mut link = LinkStd::new_std(from, port);

        link.write_command(Address::DEVICE, self.id, self.command.as_bytes())?;

        loop {
            match link.read_reply() {
                Ok(LinkRead::Frame(raw)) => {
                    print_reply(raw.sender, raw.frame_id, raw.data());
                    return Ok(());
                }
                Ok(LinkRead::Bad(e)) => {
                    // other bus traffic, or damage; keep waiting
                    eprintln!("(skipping frame: {:?})", e);
                }
                Ok(LinkRead::Pending) => {}
                Err(LinkError::Io(ref e)) if crate::common::is_timeout(e) => {
                    eprintln!("(still waiting for a reply)");
                }
                Err(e) => anyhow::bail!(e),
            }
        }
    }
}

pub fn print_reply(sender: Address, frame_id: u8, payload: &[u8]) {
    match ReplyData::parse(payload) {
        Some(data) => println!("{} #{:02}: {:?}", sender, frame_id, data),
        None => println!(
            "{} #{:02}: unrecognized payload {:?}",
            sender,
            frame_id,
            String::from_utf8_lossy(payload)
        ),
    }
}
