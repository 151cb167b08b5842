pub mod args;
pub mod inspect;

pub use args::{Cli, CliCommand, InspectCliArgs, LocateCliArgs, ServeCliArgs, SourceArgs};
pub use inspect::{handle_inspect_command, handle_locate_command, load_fragments};
