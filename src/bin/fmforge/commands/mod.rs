mod layout;
mod model;
mod tables;

use layout::run_layout;
use tables::run_tables;

use anyhow::Result;

use crate::cli::Command;
use crate::display::Context;

pub fn dispatch(command: Command, ctx: Context) -> Result<()> {
    match command {
        Command::Layout(args) => run_layout(args, ctx),
        Command::Tables(args) => run_tables(args, ctx),
    }
}
