use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use litquery::commands::config::{self, ConfigArgs};
use litquery::commands::tasks::{self, ClassifyArgs, ExtrapolateArgs, TagArgs};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit: ",
    env!("LITQ_GIT_SHA"),
    ", built: ",
    env!("LITQ_BUILD_TS"),
    ")"
);

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  litq tag \"Quarterly sales grew by 12%.\"\n  echo \"Is this spam?\" | litq classify --class spam --most-common\n  litq extrapolate -f to_id -e \"User Id=userid\" \"Order Date\"\n  litq config check\n  litq completion bash > ~/.local/share/bash-completion/completions/litq";

const TAG_HELP_EXAMPLES: &str = "Examples:\n  litq tag \"Quarterly sales grew by 12%.\"\n  litq tag --provider ai21 --most-common --limit 5 \"Quarterly sales grew by 12%.\"\n  litq tag --dry-run --json \"Quarterly sales grew by 12%.\"";

const CLASSIFY_HELP_EXAMPLES: &str = "Examples:\n  litq classify --class spam \"Win a free cruise!\"\n  litq classify -c question -c complaint \"Why is my order late?\"";

const EXTRAPOLATE_HELP_EXAMPLES: &str = "Examples:\n  litq extrapolate -f to_id -e \"User Id=userid\" -e \"Created At=createdat\" \"Order Date\"\n  litq reverse -f to_id -e \"User Id=userid\" orderdate";

#[derive(Debug, Parser)]
#[command(
    name = "litq",
    version = VERSION,
    about = "Typed literal queries against text-completion models",
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(
        about = "Extract topic tags from text",
        after_help = TAG_HELP_EXAMPLES
    )]
    Tag(TagArgs),
    #[command(
        about = "Classify text against one or more classes",
        after_help = CLASSIFY_HELP_EXAMPLES
    )]
    Classify(ClassifyArgs),
    #[command(
        about = "Predict a function value from examples",
        after_help = EXTRAPOLATE_HELP_EXAMPLES
    )]
    Extrapolate(ExtrapolateArgs),
    #[command(
        about = "Predict the input that yields a value",
        after_help = EXTRAPOLATE_HELP_EXAMPLES
    )]
    Reverse(ExtrapolateArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "litq", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "litq", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "litq", &mut io::stdout()),
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tag(args) => tasks::run_tag(args),
        Commands::Classify(args) => tasks::run_classify(args),
        Commands::Extrapolate(args) => tasks::run_extrapolate(args),
        Commands::Reverse(args) => tasks::run_reverse(args),
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
