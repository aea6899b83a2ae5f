use anyhow::{Context, Result};

use fm_forge::{CgModel, InteractionFamily, ModelConfig, Topology};

use crate::cli::ModelOptions;
use crate::display::Progress;
use crate::io::{open_input, read_text};
use crate::util::text::count_noun;

const READ_STEP: &str = "Reading model inputs";
const BUILD_STEP: &str = "Building interaction model";

/// Reads the configuration and topology, then runs the setup pipeline.
pub fn load_model(options: &ModelOptions, progress: &mut Progress) -> Result<CgModel> {
    progress.step(READ_STEP);
    let config = match &options.control {
        Some(path) => ModelConfig::from_toml_str(&read_text(path)?)
            .with_context(|| format!("Invalid model configuration: {}", path.display()))?,
        None => {
            log::info!("No configuration given; using defaults");
            ModelConfig::default()
        }
    };
    let topology = Topology::from_toml_str(&read_text(&options.topology)?)
        .map_err(fm_forge::Error::from)
        .with_context(|| format!("Invalid topology: {}", options.topology.display()))?;
    progress.complete_step(
        READ_STEP,
        &[
            format!("{} basis, k = {}", config.basis, config.bspline_k),
            format!(
                "{}, {}",
                count_noun(topology.n_types(), "CG type"),
                count_noun(topology.n_sites(), "site")
            ),
        ],
    );

    progress.step(BUILD_STEP);
    let nonbonded = open_input(&options.nonbonded_ranges)?;
    let bonded = open_input(&options.bonded_ranges)?;
    let table = options.table.as_deref().map(open_input).transpose()?;
    let model = CgModel::build(config, topology, nonbonded, bonded, table)
        .context("Interaction model setup failed")?;

    let mut details = vec![format!(
        "Ranges from {} and {}",
        options.nonbonded_ranges.display(),
        options.bonded_ranges.display()
    )];
    if let Some(path) = &options.table {
        details.push(format!(
            "{} from {}",
            count_noun(model.n_tabulated(), "tabulated interaction"),
            path.display()
        ));
    }
    let matched: usize = InteractionFamily::ALL
        .iter()
        .map(|&f| model.class(f).n_matched())
        .sum();
    details.push(format!(
        "{} over {}",
        count_noun(matched, "matched interaction"),
        count_noun(model.n_columns(), "column")
    ));
    progress.complete_step(BUILD_STEP, &details);

    Ok(model)
}
