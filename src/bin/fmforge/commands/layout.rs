use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::cli::LayoutArgs;
use crate::commands::model::load_model;
use crate::display::{Context as DisplayContext, Progress, print_column_layout, print_model_summary};

const TOTAL_STEPS: u8 = 2;

pub fn run_layout(args: LayoutArgs, ctx: DisplayContext) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);
    let model = load_model(&args.model, &mut progress)?;
    progress.finish("Setup complete");

    if ctx.interactive {
        print_model_summary(&model);
    }

    let mut stdout = io::stdout().lock();
    print_column_layout(&mut stdout, &model)
        .and_then(|()| stdout.flush())
        .context("Failed to write the column layout")?;

    Ok(())
}
