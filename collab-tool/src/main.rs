mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use collab_dataset::{
    lerobot_home, push_to_hub, ConvertInit, ConvertSummary, HubClient, LeRobotDatasetMetadata,
};
use collab_policy::{collab_inputs, make_collab_example, ModelType};
use config::Config;
use log::{error, info, LevelFilter};
use prettytable::{cell, row, Table};
use std::{
    env,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Parser)]
/// Convert Collab xArm recordings into LeRobot datasets
enum Opts {
    /// Convert episode recordings into a LeRobot dataset
    Convert(ConvertOpts),
    /// Print the metadata of a converted dataset
    Info {
        /// dataset directory
        dataset_dir: PathBuf,
    },
    /// Map a random observation to model inputs
    Example {
        #[clap(long, default_value = "pi0")]
        /// model variant: pi0, pi0_fast or pi05
        model_type: ModelType,
    },
}

#[derive(Debug, Clone, clap::Args)]
struct ConvertOpts {
    /// directory containing ep*/episode.h5 recordings
    db_dir: PathBuf,
    #[clap(long)]
    /// json5 configuration file
    config_file: Option<PathBuf>,
    #[clap(long)]
    /// dataset identifier
    repo_name: Option<String>,
    #[clap(long)]
    fps: Option<usize>,
    #[clap(long)]
    /// keep every n-th step
    downsample_factor: Option<usize>,
    #[clap(long, number_of_values = 2, value_names = &["WIDTH", "HEIGHT"])]
    image_size: Option<Vec<u32>>,
    #[clap(long)]
    /// task description attached to every frame
    default_task: Option<String>,
    #[clap(long)]
    /// directory under which the dataset is created
    output_root: Option<PathBuf>,
    #[clap(long)]
    /// upload the dataset after conversion
    push_to_hub: bool,
}

fn main() -> Result<()> {
    init_logger();

    match Opts::parse() {
        Opts::Convert(opts) => {
            convert(opts)?;
        }
        Opts::Info { dataset_dir } => {
            info(dataset_dir)?;
        }
        Opts::Example { model_type } => {
            example(model_type)?;
        }
    }

    Ok(())
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };
    builder.init();
}

/// Load the configuration file if any and apply command line overrides.
fn load_config(opts: &ConvertOpts) -> Result<Config> {
    let ConvertOpts {
        config_file,
        repo_name,
        fps,
        downsample_factor,
        image_size,
        default_task,
        output_root,
        push_to_hub,
        ..
    } = opts;

    let mut config = match config_file {
        Some(path) => Config::open(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        None => Config::default(),
    };

    if let Some(repo_name) = repo_name {
        config.repo_name = repo_name.clone();
    }
    if let Some(fps) = *fps {
        config.fps = fps;
    }
    if let Some(downsample_factor) = *downsample_factor {
        config.downsample_factor = downsample_factor;
    }
    if let Some(image_size) = image_size {
        config.image_size = match *image_size.as_slice() {
            [width, height] => [width, height],
            _ => bail!("--image-size expects WIDTH and HEIGHT"),
        };
    }
    if let Some(default_task) = default_task {
        config.default_task = default_task.clone();
    }
    if let Some(output_root) = output_root {
        config.output_root = Some(output_root.clone());
    }
    config.push_to_hub |= *push_to_hub;

    Ok(config)
}

fn convert(opts: ConvertOpts) -> Result<()> {
    let config = load_config(&opts)?;
    let Config {
        repo_name,
        fps,
        downsample_factor,
        image_size: [width, height],
        default_task,
        robot_type,
        image_writer_threads,
        output_root,
        push_to_hub: push,
        hub,
    } = config;

    let output_root = match output_root {
        Some(dir) => dir,
        None => lerobot_home()?,
    };
    let output_dir = output_root.join(&repo_name);

    let init = ConvertInit {
        episodes_dir: opts.db_dir,
        output_dir,
        fps,
        downsample_factor,
        image_size: (width, height),
        default_task,
        robot_type,
        image_writer_threads,
    };
    let summary = run_conversion(init)?;

    if push {
        let result = HubClient::from_env()
            .and_then(|client| push_to_hub(&client, &summary.output_dir, &repo_name, &hub));
        if let Err(err) = result {
            error!("failed to push {} to the hub: {:#}", repo_name, err);
            return Err(err);
        }
    }

    Ok(())
}

#[cfg(feature = "hdf5")]
fn run_conversion(init: ConvertInit) -> Result<ConvertSummary> {
    init.run(collab_dataset::Hdf5EpisodeReader)
}

#[cfg(not(feature = "hdf5"))]
fn run_conversion(_init: ConvertInit) -> Result<ConvertSummary> {
    bail!("'hdf5' feature must be enabled to read episode recordings");
}

fn info(dataset_dir: impl AsRef<Path>) -> Result<()> {
    let meta = LeRobotDatasetMetadata::load(dataset_dir)?;
    let dataset_info = &meta.info;

    // print dataset summary
    {
        let mut table = Table::new();
        table.add_row(row!["codebase_version", dataset_info.codebase_version]);
        table.add_row(row!["robot_type", dataset_info.robot_type]);
        table.add_row(row!["fps", dataset_info.fps]);
        table.add_row(row!["total_episodes", dataset_info.total_episodes]);
        table.add_row(row!["total_frames", dataset_info.total_frames]);
        table.add_row(row!["total_tasks", dataset_info.total_tasks]);
        table.add_row(row!["total_chunks", dataset_info.total_chunks]);
        table.printstd();
    }

    // print features
    {
        let mut table = Table::new();
        table.add_row(row!["feature", "dtype", "shape", "names"]);

        dataset_info.features.iter().for_each(|(key, feature)| {
            table.add_row(row![
                key,
                format!("{:?}", feature.dtype),
                format!("{:?}", feature.shape),
                feature
                    .names
                    .as_ref()
                    .map(|names| names.join(", "))
                    .unwrap_or_default(),
            ]);
        });

        table.printstd();
    }

    // print episodes
    {
        let mut table = Table::new();
        table.add_row(row!["episode_index", "length", "tasks"]);

        meta.episodes.iter().for_each(|episode| {
            table.add_row(row![
                episode.episode_index,
                episode.length,
                episode.tasks.join("; "),
            ]);
        });

        table.printstd();
    }

    Ok(())
}

fn example(model_type: ModelType) -> Result<()> {
    let observation = make_collab_example(&mut rand::thread_rng());
    let inputs = collab_inputs(observation, model_type);
    info!("mapped a random observation for {}", model_type);

    let mut table = Table::new();
    table.add_row(row!["image", "shape", "mask"]);
    inputs.image.iter().for_each(|(key, image)| {
        let mask = inputs.image_mask.get(key).copied().unwrap_or(false);
        table.add_row(row![key, format!("{:?}", image.shape()), mask]);
    });
    table.printstd();

    println!("state: {}", inputs.state);
    if let Some(prompt) = &inputs.prompt {
        println!("prompt: {}", prompt);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_convert(args: &[&str]) -> Result<ConvertOpts> {
        let args = ["collab-tool", "convert"].iter().chain(args);
        match Opts::try_parse_from(args)? {
            Opts::Convert(opts) => Ok(opts),
            opts => bail!("unexpected command {:?}", opts),
        }
    }

    #[test]
    fn default_options_test() -> Result<()> {
        let opts = parse_convert(&["/data/collab"])?;
        assert_eq!(opts.db_dir, PathBuf::from("/data/collab"));

        let config = load_config(&opts)?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn override_options_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config_file = dir.path().join("convert.json5");
        std::fs::write(
            &config_file,
            "{ fps: 30, downsample_factor: 3, default_task: 'hand over the cup' }",
        )?;

        let opts = parse_convert(&[
            "/data/collab",
            "--config-file",
            config_file.to_str().unwrap(),
            "--fps",
            "15",
            "--image-size",
            "320",
            "240",
            "--push-to-hub",
        ])?;
        let config = load_config(&opts)?;

        assert_eq!(config.fps, 15);
        assert_eq!(config.downsample_factor, 3);
        assert_eq!(config.image_size, [320, 240]);
        assert_eq!(config.default_task, "hand over the cup");
        assert!(config.push_to_hub);
        Ok(())
    }

    #[test]
    fn missing_db_dir_test() {
        assert!(Opts::try_parse_from(["collab-tool", "convert"]).is_err());
    }

    #[test]
    fn example_model_type_test() -> Result<()> {
        let opts = Opts::try_parse_from(["collab-tool", "example", "--model-type", "pi0_fast"])?;
        assert!(matches!(
            opts,
            Opts::Example {
                model_type: ModelType::Pi0Fast
            }
        ));
        Ok(())
    }
}
