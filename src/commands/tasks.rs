use clap::Args;
use serde_json::Value;

use crate::commands::CommandError;
use crate::commands::query::{
    QueryArgs, Settings, display_value, init_tracing, print_dry_run, print_results, read_input,
};
use crate::frequency::FrequencyTable;
use crate::parse::QueryMode;
use crate::tasks::prompts::{
    extrapolation_prompt, multi_class_prompt, reverse_extrapolation_prompt, single_class_prompt,
    tag_prompt,
};
use crate::tasks::{ClassificationQuery, ExtrapolationQuery};

#[derive(Debug, Args, Clone)]
pub struct TagArgs {
    #[command(flatten)]
    pub query: QueryArgs,
    /// Text to tag; read from stdin when omitted.
    pub text: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub query: QueryArgs,
    /// Class name; repeat for multi-class classification.
    #[arg(long = "class", short = 'c', required = true)]
    pub classes: Vec<String>,
    /// Text to classify; read from stdin when omitted.
    pub text: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ExtrapolateArgs {
    #[command(flatten)]
    pub query: QueryArgs,
    /// Function name used in the prompt assertions.
    #[arg(long = "function", short = 'f')]
    pub function: String,
    /// Worked example as INPUT=OUTPUT; repeatable.
    #[arg(long = "example", short = 'e', value_name = "INPUT=OUTPUT", required = true)]
    pub examples: Vec<String>,
    /// Value to extrapolate from.
    #[arg(value_name = "QUERY")]
    pub value: String,
}

pub fn run_tag(args: TagArgs) -> Result<(), CommandError> {
    init_tracing(args.query.verbose, args.query.quiet);
    let settings = Settings::resolve(&args.query)?;
    let text = read_input(args.text)?;
    let client = settings.client()?;

    if settings.dry_run {
        return print_dry_run(&settings, "tag", &tag_prompt(&text), QueryMode::List, &client);
    }

    let query = ClassificationQuery::from_client(client);
    if settings.most_common {
        let table = query.tag_most_common(&text, settings.limit)?;
        let lines = table_lines(&table)?;
        print_results(&settings, query.client(), "tag", &table, lines)
    } else {
        let tags = query.tag(&text)?;
        let lines = sample_lines(&tags)?;
        print_results(&settings, query.client(), "tag", &tags, lines)
    }
}

pub fn run_classify(args: ClassifyArgs) -> Result<(), CommandError> {
    init_tracing(args.query.verbose, args.query.quiet);
    let settings = Settings::resolve(&args.query)?;
    let text = read_input(args.text)?;
    let client = settings.client()?;

    match args.classes.as_slice() {
        [class] => {
            if settings.dry_run {
                let prompt = single_class_prompt(&text, class);
                let mode = QueryMode::Literal;
                return print_dry_run(&settings, "classify", &prompt, mode, &client);
            }
            let query = ClassificationQuery::from_client(client);
            if settings.most_common {
                let table = query.classify_most_common(&text, class, settings.limit)?;
                let lines = table_lines(&table)?;
                print_results(&settings, query.client(), "classify", &table, lines)
            } else {
                let answers = query.classify(&text, class)?;
                let lines = sample_lines(&answers)?;
                print_results(&settings, query.client(), "classify", &answers, lines)
            }
        }
        classes => {
            if settings.most_common {
                return Err(CommandError::Usage(
                    "--most-common is only supported with a single --class".to_string(),
                ));
            }
            if settings.dry_run {
                let prompt = multi_class_prompt(&text, classes);
                return print_dry_run(&settings, "classify", &prompt, QueryMode::List, &client);
            }
            let query = ClassificationQuery::from_client(client);
            let answers = query.classify_multi(&text, classes)?;
            let lines = sample_lines(&answers)?;
            print_results(&settings, query.client(), "classify", &answers, lines)
        }
    }
}

pub fn run_extrapolate(args: ExtrapolateArgs) -> Result<(), CommandError> {
    init_tracing(args.query.verbose, args.query.quiet);
    let settings = Settings::resolve(&args.query)?;
    let examples = parse_examples(&args.examples)?;
    let client = settings.client()?;

    if settings.dry_run {
        let prompt = extrapolation_prompt(&args.function, &examples, args.value.as_str())
            .map_err(crate::completion::QueryError::from)?;
        return print_dry_run(&settings, "extrapolate", &prompt, QueryMode::Literal, &client);
    }

    let query = ExtrapolationQuery::from_client(client);
    if settings.most_common {
        let table = query.extrapolate_function_value_most_common(
            &args.function,
            &examples,
            args.value.as_str(),
            settings.limit,
        )?;
        let lines = table_lines(&table)?;
        print_results(&settings, query.client(), "extrapolate", &table, lines)
    } else {
        let values =
            query.extrapolate_function_value(&args.function, &examples, args.value.as_str())?;
        let lines = sample_lines(&values)?;
        print_results(&settings, query.client(), "extrapolate", &values, lines)
    }
}

pub fn run_reverse(args: ExtrapolateArgs) -> Result<(), CommandError> {
    init_tracing(args.query.verbose, args.query.quiet);
    let settings = Settings::resolve(&args.query)?;
    let examples = parse_examples(&args.examples)?;
    let client = settings.client()?;

    if settings.dry_run {
        let prompt = reverse_extrapolation_prompt(&args.function, &examples, args.value.as_str())
            .map_err(crate::completion::QueryError::from)?;
        return print_dry_run(&settings, "reverse", &prompt, QueryMode::String, &client);
    }

    let query = ExtrapolationQuery::from_client(client);
    if settings.most_common {
        let table = query.reverse_extrapolate_function_most_common(
            &args.function,
            &examples,
            args.value.as_str(),
            settings.limit,
        )?;
        let lines = table_lines(&table)?;
        print_results(&settings, query.client(), "reverse", &table, lines)
    } else {
        let inputs =
            query.reverse_extrapolate_function(&args.function, &examples, args.value.as_str())?;
        let lines = sample_lines(&inputs)?;
        print_results(&settings, query.client(), "reverse", &inputs, lines)
    }
}

/// Splits `INPUT=OUTPUT` at the first `=`.
fn parse_examples(raw: &[String]) -> Result<Vec<(String, String)>, CommandError> {
    raw.iter()
        .map(|example| {
            example
                .split_once('=')
                .map(|(input, output)| (input.to_string(), output.to_string()))
                .ok_or_else(|| {
                    CommandError::Usage(format!(
                        "Invalid example '{example}'. Expected INPUT=OUTPUT."
                    ))
                })
        })
        .collect()
}

fn sample_lines<T: serde::Serialize>(samples: &[T]) -> Result<Vec<String>, CommandError> {
    samples
        .iter()
        .map(|sample| Ok(display_value(&serde_json::to_value(sample)?)))
        .collect()
}

fn table_lines<T: serde::Serialize>(
    table: &FrequencyTable<T>,
) -> Result<Vec<String>, CommandError> {
    table
        .iter()
        .map(|(value, count)| {
            let value: Value = serde_json::to_value(value)?;
            Ok(format!("{}\t{count}", display_value(&value)))
        })
        .collect()
}
