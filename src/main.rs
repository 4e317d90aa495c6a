#[cfg(target_env = "musl")]
use mimalloc::MiMalloc;
#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use anyhow::Context;
use clap::{crate_description, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{error, info};

use bwalign::{
    index::index_files_exist,
    map::{mapping, AlignmentParameters},
    CRATE_NAME,
};

fn main() {
    let defaults = AlignmentParameters::default();
    let matches = define_cli(&defaults).get_matches();

    simple_logger::init_with_level(match matches.get_count("v") {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    })
    .expect("This is not expected to fail");

    if let Err(e) = run(&matches, defaults) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches, defaults: AlignmentParameters) -> anyhow::Result<()> {
    if let Some(num_threads) = matches.get_one::<usize>("num_threads") {
        rayon::ThreadPoolBuilder::new()
            .num_threads(*num_threads)
            .build_global()
            .context("Failed to set up thread pool")?;
    }

    match matches.subcommand() {
        Some(("map", map_matches)) => start_mapper(map_matches, defaults),
        _ => unreachable!("A subcommand is required"),
    }
}

fn start_mapper(map_matches: &ArgMatches, defaults: AlignmentParameters) -> anyhow::Result<()> {
    let reads_path = map_matches
        .get_one::<String>("reads")
        .expect("Presence ensured by CLI definition");
    let reference_path = map_matches
        .get_one::<String>("index")
        .expect("Presence ensured by CLI definition");

    if !index_files_exist(reference_path) {
        anyhow::bail!("Index files with prefix \"{}\" could not be found", reference_path);
    }

    let get = |id: &str| map_matches.get_one::<u8>(id).copied();
    let get_penalty = |id: &str| map_matches.get_one::<u32>(id).copied();
    let alignment_parameters = AlignmentParameters {
        max_edit_distance: get("max_edit_distance").unwrap_or(defaults.max_edit_distance),
        max_gap_opens: get("max_gap_opens").unwrap_or(defaults.max_gap_opens),
        max_gap_extensions: get("max_gap_extensions").unwrap_or(defaults.max_gap_extensions),
        penalty_mismatch: get_penalty("penalty_mismatch").unwrap_or(defaults.penalty_mismatch),
        penalty_gap_open: get_penalty("penalty_gap_open").unwrap_or(defaults.penalty_gap_open),
        penalty_gap_extend: get_penalty("penalty_gap_extend")
            .unwrap_or(defaults.penalty_gap_extend),
        indel_end_skip: get("indel_end_skip").unwrap_or(defaults.indel_end_skip),
        lower_bound_pruning: !map_matches.get_flag("no_lower_bound_pruning"),
        chunk_size: map_matches
            .get_one::<usize>("chunk_size")
            .copied()
            .unwrap_or(defaults.chunk_size),
    };
    info!("{:?}", alignment_parameters);

    mapping::run(reads_path, reference_path, &alignment_parameters)
        .with_context(|| format!("Failed to map reads from \"{}\"", reads_path))
}

fn define_cli(defaults: &AlignmentParameters) -> Command {
    Command::new(CRATE_NAME)
        .about(crate_description!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("v")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::new("num_threads")
                .long("threads")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Maximum number of threads. If 0 or unspecified, the number of available CPU cores is used.")
                .value_name("INT"),
        )
        .subcommand(
            Command::new("map")
                .about("Maps reads to an indexed reference genome")
                .arg(
                    Arg::new("reads")
                        .required(true)
                        .long("reads")
                        .help("FASTQ file containing adapter-trimmed and quality-controlled reads")
                        .value_name("FASTQ file"),
                )
                .arg(
                    Arg::new("index")
                        .required(true)
                        .long("index")
                        .help("Prefix of the index files of the genome we are about to map against")
                        .value_name("PREFIX"),
                )
                .arg(
                    Arg::new("max_edit_distance")
                        .short('n')
                        .value_parser(value_parser!(u8))
                        .default_value(defaults.max_edit_distance.to_string())
                        .help("Maximum number of differences (mismatches, gap opens, and gap extensions)")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("max_gap_opens")
                        .short('o')
                        .value_parser(value_parser!(u8))
                        .default_value(defaults.max_gap_opens.to_string())
                        .help("Maximum number of gap opens")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("max_gap_extensions")
                        .short('e')
                        .value_parser(value_parser!(u8))
                        .default_value(defaults.max_gap_extensions.to_string())
                        .help("Maximum number of gap extensions")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("penalty_mismatch")
                        .short('M')
                        .value_parser(value_parser!(u32))
                        .default_value(defaults.penalty_mismatch.to_string())
                        .help("Mismatch penalty")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("penalty_gap_open")
                        .short('O')
                        .value_parser(value_parser!(u32))
                        .default_value(defaults.penalty_gap_open.to_string())
                        .help("Gap open penalty")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("penalty_gap_extend")
                        .short('E')
                        .value_parser(value_parser!(u32))
                        .default_value(defaults.penalty_gap_extend.to_string())
                        .help("Gap extension penalty")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("indel_end_skip")
                        .long("indel-end-skip")
                        .value_parser(value_parser!(u8))
                        .default_value(defaults.indel_end_skip.to_string())
                        .help("Do not place indels within this many bases of either read end")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("chunk_size")
                        .long("chunk-size")
                        .value_parser(value_parser!(usize))
                        .default_value(defaults.chunk_size.to_string())
                        .help("Number of reads mapped in parallel before results are written")
                        .value_name("INT"),
                )
                .arg(
                    Arg::new("no_lower_bound_pruning")
                        .long("no-lower-bound-pruning")
                        .action(ArgAction::SetTrue)
                        .help("Do not prune partial alignments with the lower-bound table (slow, for debugging)"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        define_cli(&AlignmentParameters::default()).debug_assert();
    }
}
