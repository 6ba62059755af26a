use crate::{
    classify::IntentClassifier,
    errors::PromptError,
    prompts::core::build_grounding_prompt,
    providers::{ai::AiProvider, db::storage::QueryBackend},
    query::{Table, Value},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// --- Catalog ---

/// One product of the HS Code catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub product_name: String,
    pub definition: String,
    pub material: String,
    pub hs_code: i64,
    pub specifications: String,
}

/// The five catalog fields, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    ProductName,
    Definition,
    Material,
    HsCode,
    Specifications,
}

impl CatalogField {
    pub const ALL: [CatalogField; 5] = [
        CatalogField::ProductName,
        CatalogField::Definition,
        CatalogField::Material,
        CatalogField::HsCode,
        CatalogField::Specifications,
    ];

    /// The column label shown to users and used by the tabular dialect.
    pub fn display_name(self) -> &'static str {
        match self {
            CatalogField::ProductName => "Product Name",
            CatalogField::Definition => "Definition",
            CatalogField::Material => "Material",
            CatalogField::HsCode => "HS Code",
            CatalogField::Specifications => "Specifications",
        }
    }

    /// The column name of the mirrored SQL table.
    pub fn sql_name(self) -> &'static str {
        match self {
            CatalogField::ProductName => "product_name",
            CatalogField::Definition => "definition",
            CatalogField::Material => "material",
            CatalogField::HsCode => "hs_code",
            CatalogField::Specifications => "specifications",
        }
    }

    /// Resolves a display name exactly as written; column lookups are case-sensitive.
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.display_name() == name)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, CatalogField::HsCode)
    }

    /// Reads this field from a row.
    pub fn value_of(self, row: &CatalogRow) -> Value {
        match self {
            CatalogField::ProductName => Value::Text(row.product_name.clone()),
            CatalogField::Definition => Value::Text(row.definition.clone()),
            CatalogField::Material => Value::Text(row.material.clone()),
            CatalogField::HsCode => Value::Integer(row.hs_code),
            CatalogField::Specifications => Value::Text(row.specifications.clone()),
        }
    }
}

/// An immutable snapshot of the product catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    rows: Vec<CatalogRow>,
}

impl Catalog {
    pub fn new(rows: Vec<CatalogRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The whole catalog as a table with display column names, in sheet order.
    pub fn to_table(&self) -> Table {
        let columns = CatalogField::ALL
            .iter()
            .map(|f| f.display_name().to_string())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| CatalogField::ALL.iter().map(|f| f.value_of(row)).collect())
            .collect();
        Table::new(columns, rows)
    }
}

// --- Conversation ---

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// The append-only message log of one chat session.
///
/// The whole log is resent to the completion endpoint on every lookup, so it is
/// never truncated or reordered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::new(Role::User, text));
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::new(Role::Assistant, text));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

// --- Pipeline results ---

/// How a submission was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// Not a lookup; the fixed acknowledgement was recorded.
    Acknowledged,
    /// A query was generated and executed successfully.
    Answered,
    /// A query was generated but could not be executed.
    QueryFailed,
    /// The completion endpoint failed before a query was obtained.
    CompletionFailed,
}

/// The outcome of one pipeline run, returned to whatever surface drives the chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub kind: TurnKind,
    /// The expression returned by the model, echoed for transparency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_query: Option<String>,
    /// The assistant text that was appended to the conversation.
    pub reply: String,
}

// --- Configuration choices ---

/// Selects which executor runs the generated expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryBackendKind {
    #[default]
    Tabular,
    Sql,
}

// --- Assistant ---

/// The lookup assistant: classifies messages, asks the AI provider for a query,
/// runs it on the configured backend and records the result.
pub struct LookupAssistant {
    pub ai_provider: Box<dyn AiProvider>,
    pub backend: Box<dyn QueryBackend>,
    pub classifier: IntentClassifier,
    pub(crate) system_prompt: String,
}

impl fmt::Debug for LookupAssistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupAssistant")
            .field("ai_provider", &self.ai_provider)
            .field("backend", &self.backend)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

/// A builder for creating `LookupAssistant` instances.
///
/// The grounding prompt is rendered once in `build`, from the catalog snapshot and
/// the dialect of the chosen backend, so the syntax advertised to the model always
/// matches the executor that runs it.
#[derive(Default)]
pub struct LookupAssistantBuilder {
    ai_provider: Option<Box<dyn AiProvider>>,
    backend: Option<Box<dyn QueryBackend>>,
    classifier: IntentClassifier,
    catalog: Option<Arc<Catalog>>,
}

impl LookupAssistantBuilder {
    /// Creates a new `LookupAssistantBuilder`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hslookup::LookupAssistantBuilder;
    ///
    /// let builder = LookupAssistantBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the AI provider used to translate questions into queries.
    pub fn ai_provider(mut self, ai_provider: Box<dyn AiProvider>) -> Self {
        self.ai_provider = Some(ai_provider);
        self
    }

    /// Sets the backend that executes generated queries.
    pub fn backend(mut self, backend: Box<dyn QueryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sets the catalog snapshot embedded in the grounding prompt.
    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Builds the `LookupAssistant`.
    pub fn build(self) -> Result<LookupAssistant, PromptError> {
        let ai_provider = self.ai_provider.ok_or(PromptError::MissingAiProvider)?;
        let backend = self.backend.ok_or(PromptError::MissingQueryBackend)?;
        let catalog = self.catalog.unwrap_or_default();
        let system_prompt = build_grounding_prompt(&catalog, backend.dialect());

        Ok(LookupAssistant {
            ai_provider,
            backend,
            classifier: self.classifier,
            system_prompt,
        })
    }
}
