use serde::Serialize;

use crate::completion::{CompletionClient, Provider, QueryError};
use crate::frequency::{FrequencyTable, most_common, most_common_literals};
use crate::literal::Literal;
use crate::tasks::prompts::{extrapolation_prompt, reverse_extrapolation_prompt};

/// Few-shot function-value extrapolation.
///
/// Examples are `(input, output)` pairs of a function the model has to
/// infer. Inputs, outputs and the query are embedded as JSON.
#[derive(Debug, Clone)]
pub struct ExtrapolationQuery {
    client: CompletionClient,
}

impl ExtrapolationQuery {
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

    /// Predicts `function(query)`.
    pub fn extrapolate_function_value<K, V, Q>(
        &self,
        function: &str,
        examples: &[(K, V)],
        query: &Q,
    ) -> Result<Vec<Literal>, QueryError>
    where
        K: Serialize,
        V: Serialize,
        Q: Serialize + ?Sized,
    {
        let prompt = extrapolation_prompt(function, examples, query)?;
        self.client.literal_query(&prompt, None)
    }

    pub fn extrapolate_function_value_most_common<K, V, Q>(
        &self,
        function: &str,
        examples: &[(K, V)],
        query: &Q,
        limit: Option<usize>,
    ) -> Result<FrequencyTable<Literal>, QueryError>
    where
        K: Serialize,
        V: Serialize,
        Q: Serialize + ?Sized,
    {
        Ok(most_common_literals(
            self.extrapolate_function_value(function, examples, query)?,
            limit,
        ))
    }

    /// Predicts the string input for which `function` returns `query`.
    pub fn reverse_extrapolate_function<K, V, Q>(
        &self,
        function: &str,
        examples: &[(K, V)],
        query: &Q,
    ) -> Result<Vec<String>, QueryError>
    where
        K: Serialize,
        V: Serialize,
        Q: Serialize + ?Sized,
    {
        let prompt = reverse_extrapolation_prompt(function, examples, query)?;
        self.client.str_query(&prompt)
    }

    pub fn reverse_extrapolate_function_most_common<K, V, Q>(
        &self,
        function: &str,
        examples: &[(K, V)],
        query: &Q,
        limit: Option<usize>,
    ) -> Result<FrequencyTable<String>, QueryError>
    where
        K: Serialize,
        V: Serialize,
        Q: Serialize + ?Sized,
    {
        Ok(most_common(
            self.reverse_extrapolate_function(function, examples, query)?,
            limit,
        ))
    }
}
