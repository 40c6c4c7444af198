//! Prompt templates for the task queries.
//!
//! Every template leaves the answer open (`[`, `==` or `f("`) so the
//! completion is the answer itself.

use indoc::formatdoc;
use serde::Serialize;

/// Prompt that asks for the interior of a `tags == [` list.
pub fn tag_prompt(text: &str) -> String {
    formatdoc! {r#"
        text = """{text}"""
        # extract tags from text
        tags = extract_tags(text)

        assert tags == ["#,
        text = quote_block(text),
    }
}

/// Prompt that asks for one boolean per class, with two worked examples.
pub fn multi_class_prompt<S: AsRef<str>>(text: &str, classes: &[S]) -> String {
    let classes = classes
        .iter()
        .map(|class| format!("'{}'", escape_single_quoted(class.as_ref())))
        .collect::<Vec<_>>()
        .join(",");
    formatdoc! {r#"
        text = """{text}"""
        # classify returns True if the text belongs to the corresponding class
        assert classify("Harry Potter", ["book", "movie", "food"]) == [True, True, False]
        assert classify("Wild coyote", ["wildlife", "economics"]) == [True, False]
        assert classify(text, [{classes}]) == ["#,
        text = quote_block(text),
        classes = classes,
    }
}

/// Prompt that asks whether the text belongs to a single class.
pub fn single_class_prompt(text: &str, class: &str) -> String {
    formatdoc! {r#"
        text = """{text}"""
        # check if text is classified correctly
        assert is_{class}(text) =="#,
        text = quote_block(text),
        class = identifier(class),
    }
}

/// One `assert f(input) == output` line per example, then an open
/// `assert f(query) == ` line.
pub fn extrapolation_prompt<K, V, Q>(
    function: &str,
    examples: &[(K, V)],
    query: &Q,
) -> Result<String, serde_json::Error>
where
    K: Serialize,
    V: Serialize,
    Q: Serialize + ?Sized,
{
    let mut lines = Vec::with_capacity(examples.len() + 1);
    for (input, output) in examples {
        lines.push(format!(
            "assert {function}({}) == {}",
            serde_json::to_string(input)?,
            serde_json::to_string(output)?
        ));
    }
    lines.push(format!(
        "assert {function}({}) == ",
        serde_json::to_string(query)?
    ));
    Ok(lines.join("\n"))
}

/// Inverted assertions, ending inside an open string argument so the
/// completion is the input that produces `query`.
pub fn reverse_extrapolation_prompt<K, V, Q>(
    function: &str,
    examples: &[(K, V)],
    query: &Q,
) -> Result<String, serde_json::Error>
where
    K: Serialize,
    V: Serialize,
    Q: Serialize + ?Sized,
{
    let mut lines = Vec::with_capacity(examples.len() + 1);
    for (input, output) in examples {
        lines.push(format!(
            "assert {} == {function}({})",
            serde_json::to_string(output)?,
            serde_json::to_string(input)?
        ));
    }
    lines.push(format!(
        "assert {} == {function}(\"",
        serde_json::to_string(query)?
    ));
    Ok(lines.join("\n"))
}

fn quote_block(text: &str) -> String {
    text.replace(r#"""""#, r#"\"\"\""#)
}

fn escape_single_quoted(value: &str) -> String {
    value.replace('\\', r"\\").replace('\'', r"\'")
}

/// Class names become part of a function name, so anything that is not an
/// identifier character is replaced with `_`.
fn identifier(class: &str) -> String {
    class
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
