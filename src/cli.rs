use crate::codebook::{InitializerKind, Quality};
use crate::tiler::TileSize;
use crate::{Arguments, Mode};
use clap::{
    arg, crate_authors, crate_description, crate_name, crate_version, value_parser, Arg,
    ArgMatches, Command,
};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use std::{io, thread};

pub struct CLIParser {
    command: Command,
}

impl CLIParser {
    pub fn new() -> Self {
        let command = Self::create_base_command();
        let command = Self::register_arguments(command);
        CLIParser { command }
    }

    pub fn parse<I, T>(&mut self, itr: I) -> Arguments
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self
            .command
            .try_get_matches_from_mut(itr)
            .unwrap_or_else(|e| e.exit());
        Self::extract_arguments(&matches)
    }

    fn register_arguments(command: Command) -> Command {
        let command = Self::register_input_file_argument(command);
        let command = Self::register_output_file_argument(command);
        let command = Self::register_mode_argument(command);
        let command = Self::register_tile_size_argument(command);
        let command = Self::register_quality_argument(command);
        let command = Self::register_initializer_argument(command);
        let command = Self::register_max_iterations_argument(command);
        let command = Self::register_epsilon_argument(command);
        let command = Self::register_threads_argument(command);
        let command = Self::register_preview_argument(command);
        Self::register_time_limit_argument(command)
    }

    fn register_input_file_argument(command: Command) -> Command {
        command.arg(Self::create_input_file_argument())
    }

    fn register_output_file_argument(command: Command) -> Command {
        command.arg(Self::create_output_file_argument())
    }

    fn register_mode_argument(command: Command) -> Command {
        command.arg(Self::create_mode_argument())
    }

    fn register_tile_size_argument(command: Command) -> Command {
        command.arg(Self::create_tile_size_argument())
    }

    fn register_quality_argument(command: Command) -> Command {
        command.arg(Self::create_quality_argument())
    }

    fn register_initializer_argument(command: Command) -> Command {
        command.arg(Self::create_initializer_argument())
    }

    fn register_max_iterations_argument(command: Command) -> Command {
        command.arg(Self::create_max_iterations_argument())
    }

    fn register_epsilon_argument(command: Command) -> Command {
        command.arg(Self::create_epsilon_argument())
    }

    fn register_threads_argument(command: Command) -> Command {
        command.arg(Self::create_threads_argument())
    }

    fn register_preview_argument(command: Command) -> Command {
        command.arg(Self::create_preview_argument())
    }

    fn register_time_limit_argument(command: Command) -> Command {
        command.arg(Self::create_time_limit_argument())
    }

    fn create_base_command() -> Command {
        Command::new(crate_name!())
            .version(crate_version!())
            .author(crate_authors!())
            .about(crate_description!())
    }

    fn create_input_file_argument() -> Arg {
        Arg::new("input_file")
            .help("Path to the Netpbm image or the compressed artifact to read")
            .value_parser(value_parser!(PathBuf))
            .required(true)
    }

    fn create_output_file_argument() -> Arg {
        Arg::new("output_file")
            .help("Path to the compressed artifact or the Netpbm image to write")
            .value_parser(value_parser!(PathBuf))
            .required(true)
    }

    fn create_mode_argument() -> Arg {
        arg!(mode: -m --mode <MODE> "Compress an image or decompress an artifact")
            .default_value("Compress")
            .value_parser(value_parser!(Mode))
    }

    fn create_tile_size_argument() -> Arg {
        arg!(tile_size: -s --tile_size <SIZE> "Edge length of the square tiles")
            .default_value("4")
            .value_parser(value_parser!(TileSize))
    }

    fn create_quality_argument() -> Arg {
        arg!(quality: -q --quality <QUALITY> "Quality level selecting the codebook size")
            .default_value("Medium")
            .value_parser(value_parser!(Quality))
    }

    fn create_initializer_argument() -> Arg {
        arg!(initializer: -i --initializer <INITIALIZER> "Codebook construction strategy")
            .default_value("StrideSample")
            .value_parser(value_parser!(InitializerKind))
    }

    fn create_max_iterations_argument() -> Arg {
        arg!(max_iterations: --max_iterations <ITERATIONS> "Upper bound of LBG refinement iterations")
            .default_value("20")
            .required(false)
            .value_parser(value_parser!(u32))
    }

    fn create_epsilon_argument() -> Arg {
        arg!(epsilon: --epsilon <EPSILON> "Relative distortion improvement below which LBG stops")
            .default_value("0.001")
            .required(false)
            .value_parser(value_parser!(f64))
    }

    fn create_threads_argument() -> Arg {
        arg!(-t --threads <THREADS> "Number of Threads")
            .default_value(get_number_of_threads().unwrap_or(1).to_string())
            .required(false)
            .value_parser(value_parser!(usize))
    }

    fn create_preview_argument() -> Arg {
        arg!(preview: -p --preview <FILE> "Also write the decompressed image to this file")
            .required(false)
            .value_parser(value_parser!(PathBuf))
    }

    fn create_time_limit_argument() -> Arg {
        arg!(time_limit: --time_limit <SECONDS> "Abort the compression after this many seconds")
            .required(false)
            .value_parser(value_parser!(u64))
    }

    fn extract_arguments(matches: &ArgMatches) -> Arguments {
        Arguments {
            mode: Self::extract_mode_argument(matches),
            input_file: Self::extract_input_file_argument(matches),
            output_file: Self::extract_output_file_argument(matches),
            tile_size: Self::extract_tile_size_argument(matches),
            quality: Self::extract_quality_argument(matches),
            initializer: Self::extract_initializer_argument(matches),
            max_iterations: Self::extract_max_iterations_argument(matches),
            convergence_epsilon: Self::extract_epsilon_argument(matches),
            number_of_threads: Self::extract_threads_argument(matches),
            preview_file: Self::extract_preview_argument(matches),
            time_limit: Self::extract_time_limit_argument(matches),
        }
    }

    fn extract_input_file_argument(matches: &ArgMatches) -> PathBuf {
        matches
            .get_one::<PathBuf>("input_file")
            .expect("Required argument input_file not provided")
            .clone()
    }

    fn extract_output_file_argument(matches: &ArgMatches) -> PathBuf {
        matches
            .get_one::<PathBuf>("output_file")
            .expect("Required argument output_file not provided")
            .clone()
    }

    fn extract_mode_argument(matches: &ArgMatches) -> Mode {
        matches
            .get_one::<Mode>("mode")
            .expect("Mode must be provided, but was unset.")
            .to_owned()
    }

    fn extract_tile_size_argument(matches: &ArgMatches) -> TileSize {
        matches
            .get_one::<TileSize>("tile_size")
            .expect("Tile size must be provided, but was unset.")
            .to_owned()
    }

    fn extract_quality_argument(matches: &ArgMatches) -> Quality {
        matches
            .get_one::<Quality>("quality")
            .expect("Quality must be provided, but was unset.")
            .to_owned()
    }

    fn extract_initializer_argument(matches: &ArgMatches) -> InitializerKind {
        matches
            .get_one::<InitializerKind>("initializer")
            .expect("Initializer must be provided, but was unset.")
            .to_owned()
    }

    fn extract_max_iterations_argument(matches: &ArgMatches) -> u32 {
        matches
            .get_one::<u32>("max_iterations")
            .expect("Maximum iterations must be provided, but was unset.")
            .to_owned()
    }

    fn extract_epsilon_argument(matches: &ArgMatches) -> f64 {
        matches
            .get_one::<f64>("epsilon")
            .expect("Epsilon must be provided, but was unset.")
            .to_owned()
    }

    fn extract_threads_argument(matches: &ArgMatches) -> usize {
        matches
            .get_one::<usize>("threads")
            .expect("Required argument threads not provided")
            .to_owned()
    }

    fn extract_preview_argument(matches: &ArgMatches) -> Option<PathBuf> {
        matches.get_one::<PathBuf>("preview").cloned()
    }

    fn extract_time_limit_argument(matches: &ArgMatches) -> Option<Duration> {
        matches
            .get_one::<u64>("time_limit")
            .map(|seconds| Duration::from_secs(*seconds))
    }
}

impl Default for CLIParser {
    fn default() -> Self {
        Self::new()
    }
}

fn get_number_of_threads() -> io::Result<usize> {
    Ok(thread::available_parallelism()?.get())
}
