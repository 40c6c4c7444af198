use indexmap::IndexMap;

use crate::completion::{CompletionClient, Provider, QueryError};
use crate::frequency::{FrequencyTable, most_common_flattened, most_common_literals};
use crate::literal::{Literal, LiteralKind};
use crate::tasks::prompts::{multi_class_prompt, single_class_prompt, tag_prompt};

/// Tag extraction and classification over free text.
#[derive(Debug, Clone)]
pub struct ClassificationQuery {
    client: CompletionClient,
}

impl ClassificationQuery {
    /// Creates a query client using the provider's task default model.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self::from_client(
            CompletionClient::new(provider, api_key).with_model(provider.task_default_model()),
        )
    }

    pub fn from_client(client: CompletionClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    /// One tag list per usable sample; non-string tags are discarded.
    pub fn tag(&self, text: &str) -> Result<Vec<Vec<String>>, QueryError> {
        let lists = self
            .client
            .list_query(&tag_prompt(text), Some(LiteralKind::Str))?;
        Ok(lists
            .into_iter()
            .map(|tags| tags.into_iter().filter_map(Literal::into_string).collect::<Vec<_>>())
            .collect())
    }

    /// Individual tags across all samples, most frequent first.
    pub fn tag_most_common(
        &self,
        text: &str,
        limit: Option<usize>,
    ) -> Result<FrequencyTable<String>, QueryError> {
        Ok(most_common_flattened(self.tag(text)?, limit))
    }

    /// Per-sample answers to `is_<class>(text)`, usually booleans.
    pub fn classify(&self, text: &str, class: &str) -> Result<Vec<Literal>, QueryError> {
        self.client
            .literal_query(&single_class_prompt(text, class), None)
    }

    pub fn classify_most_common(
        &self,
        text: &str,
        class: &str,
        limit: Option<usize>,
    ) -> Result<FrequencyTable<Literal>, QueryError> {
        Ok(most_common_literals(self.classify(text, class)?, limit))
    }

    /// Per-sample class memberships, keyed in the order the classes were
    /// given. Answers whose length differs from the number of classes are
    /// dropped.
    pub fn classify_multi<S: AsRef<str>>(
        &self,
        text: &str,
        classes: &[S],
    ) -> Result<Vec<IndexMap<String, Literal>>, QueryError> {
        if classes.is_empty() {
            return Err(QueryError::Configuration(
                "at least one class is required".to_string(),
            ));
        }
        let answers = self
            .client
            .list_query(&multi_class_prompt(text, classes), None)?;
        Ok(zip_classes(classes, answers))
    }
}

pub(crate) fn zip_classes<S: AsRef<str>>(
    classes: &[S],
    answers: Vec<Vec<Literal>>,
) -> Vec<IndexMap<String, Literal>> {
    answers
        .into_iter()
        .filter(|answer| {
            let keep = answer.len() == classes.len();
            if !keep {
                tracing::debug!(
                    expected = classes.len(),
                    got = answer.len(),
                    "dropping classification with wrong arity"
                );
            }
            keep
        })
        .map(|answer| {
            classes
                .iter()
                .map(|class| class.as_ref().to_string())
                .zip(answer)
                .collect::<IndexMap<_, _>>()
        })
        .collect()
}
