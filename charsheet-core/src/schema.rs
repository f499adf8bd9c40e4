//! Decoding rulebook and sheet documents.
//!
//! Documents are JSON trees. Union types carry a `"case"` key naming the
//! variant; primitive payloads sit under `"value"`, structured payloads sit
//! next to the case key. For example a number reference to a variable:
//!
//! ```json
//! { "case": "variable_reference",
//!   "value": { "case": "variable_id", "value": "strength" } }
//! ```
//!
//! Every error carries the path of the node that failed to decode.

use crate::dice::{DiceRoll, RollModifier};
use crate::function::{Function, Tuple, TypeSignature, MAX_PARAMETERS};
use crate::id::{BindingName, FunctionId, MechanicCategoryId, MechanicId, ProgramId, SummationId, ValueId, ValueSetId};
use crate::mechanic::Mechanic;
use crate::program::{Invocation, Program, Statement, StatementParameter};
use crate::reference::{BooleanReference, DataReference, DiceRollReference, NumberReference};
use crate::rulebook::{Rulebook, RulebookReference};
use crate::summation::{Summation, SummationTerm};
use crate::value::{EngineValue, EngineValueType};
use crate::value_set::{Value, ValuePayload, ValueReference, ValueSet};
use crate::variable::{
    BooleanVariableValue, DiceRollVariableValue, HistoryEntry, NumberVariableHistory, NumberVariableValue,
    TextVariableValue, Variable, VariableId, VariableReference, VariableTag, VariableValue,
};
use serde_json::{Map, Value as Json};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Errors and paths
// ============================================================================

/// The kind of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Dict,
    List,
    Text,
    Number,
    Boolean,
    Null,
}

impl DocType {
    fn of(value: &Json) -> Self {
        match value {
            Json::Object(_) => DocType::Dict,
            Json::Array(_) => DocType::List,
            Json::String(_) => DocType::Text,
            Json::Number(_) => DocType::Number,
            Json::Bool(_) => DocType::Boolean,
            Json::Null => DocType::Null,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocType::Dict => "dict",
            DocType::List => "list",
            DocType::Text => "text",
            DocType::Number => "number",
            DocType::Boolean => "boolean",
            DocType::Null => "null",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a node inside a document, printed like `$.functions[0].label`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocPath(Vec<PathSegment>);

impl DocPath {
    fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        DocPath(segments)
    }

    fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        DocPath(segments)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("{path}: expected {expected}, found {found}")]
    UnexpectedType {
        path: DocPath,
        expected: DocType,
        found: DocType,
    },

    #[error("{path}: unexpected value {value}")]
    UnexpectedValue { path: DocPath, value: String },

    #[error("{path}: unknown case '{case}'")]
    UnknownCase { path: DocPath, case: String },

    #[error("{path}: missing key '{key}'")]
    MissingKey { path: DocPath, key: String },
}

impl DecodeError {
    pub fn path(&self) -> &DocPath {
        match self {
            DecodeError::UnexpectedType { path, .. }
            | DecodeError::UnexpectedValue { path, .. }
            | DecodeError::UnknownCase { path, .. }
            | DecodeError::MissingKey { path, .. } => path,
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

// ============================================================================
// Document cursor
// ============================================================================

/// A node of a document together with its path.
#[derive(Debug, Clone)]
pub struct Doc<'a> {
    value: &'a Json,
    path: DocPath,
}

impl<'a> Doc<'a> {
    pub fn root(value: &'a Json) -> Self {
        Self {
            value,
            path: DocPath::default(),
        }
    }

    pub fn path(&self) -> &DocPath {
        &self.path
    }

    pub fn raw(&self) -> &'a Json {
        self.value
    }

    fn unexpected(&self, expected: DocType) -> DecodeError {
        DecodeError::UnexpectedType {
            path: self.path.clone(),
            expected,
            found: DocType::of(self.value),
        }
    }

    pub fn unexpected_value(&self, value: impl fmt::Display) -> DecodeError {
        DecodeError::UnexpectedValue {
            path: self.path.clone(),
            value: value.to_string(),
        }
    }

    pub fn dict(&self) -> DecodeResult<&'a Map<String, Json>> {
        self.value.as_object().ok_or_else(|| self.unexpected(DocType::Dict))
    }

    /// The child at `key`. A missing or null child is an error.
    pub fn at(&self, key: &str) -> DecodeResult<Doc<'a>> {
        self.maybe_at(key)?.ok_or_else(|| DecodeError::MissingKey {
            path: self.path.clone(),
            key: key.to_string(),
        })
    }

    /// The child at `key`, if present and not null.
    pub fn maybe_at(&self, key: &str) -> DecodeResult<Option<Doc<'a>>> {
        Ok(self.dict()?.get(key).filter(|v| !v.is_null()).map(|value| Doc {
            value,
            path: self.path.key(key),
        }))
    }

    pub fn text(&self) -> DecodeResult<&'a str> {
        self.value.as_str().ok_or_else(|| self.unexpected(DocType::Text))
    }

    pub fn number(&self) -> DecodeResult<f64> {
        self.value.as_f64().ok_or_else(|| self.unexpected(DocType::Number))
    }

    /// A number that must be whole.
    pub fn integer(&self) -> DecodeResult<i64> {
        let n = self.number()?;
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(self.unexpected_value(n));
        }
        Ok(n as i64)
    }

    pub fn boolean(&self) -> DecodeResult<bool> {
        self.value.as_bool().ok_or_else(|| self.unexpected(DocType::Boolean))
    }

    pub fn list(&self) -> DecodeResult<Vec<Doc<'a>>> {
        let items = self.value.as_array().ok_or_else(|| self.unexpected(DocType::List))?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, value)| Doc {
                value,
                path: self.path.index(i),
            })
            .collect())
    }

    /// The union discriminator of this node.
    pub fn case(&self) -> DecodeResult<&'a str> {
        self.at("case")?.text()
    }

    fn unknown_case(&self, case: &str) -> DecodeError {
        DecodeError::UnknownCase {
            path: self.path.key("case"),
            case: case.to_string(),
        }
    }

    pub fn text_at(&self, key: &str) -> DecodeResult<String> {
        Ok(self.at(key)?.text()?.to_string())
    }

    pub fn maybe_text_at(&self, key: &str) -> DecodeResult<Option<String>> {
        self.maybe_at(key)?
            .map(|doc| doc.text().map(str::to_string))
            .transpose()
    }

    /// Decode every item of the list at `key`; a missing list is empty.
    pub fn list_at<T: FromDocument>(&self, key: &str) -> DecodeResult<Vec<T>> {
        match self.maybe_at(key)? {
            Some(doc) => doc.list()?.iter().map(T::from_document).collect(),
            None => Ok(Vec::new()),
        }
    }

    pub fn decode_at<T: FromDocument>(&self, key: &str) -> DecodeResult<T> {
        T::from_document(&self.at(key)?)
    }

    pub fn maybe_decode_at<T: FromDocument>(&self, key: &str) -> DecodeResult<Option<T>> {
        self.maybe_at(key)?.map(|doc| T::from_document(&doc)).transpose()
    }

    /// Decode the positional keys `parameter1`, `parameter2`, ... in order.
    ///
    /// Parameters must be contiguous and there may be at most
    /// [`MAX_PARAMETERS`] of them.
    fn parameters<T: FromDocument>(&self) -> DecodeResult<Vec<T>> {
        self.positional("parameter", "")?
            .iter()
            .map(T::from_document)
            .collect()
    }

    fn positional(&self, prefix: &str, suffix: &str) -> DecodeResult<Vec<Doc<'a>>> {
        for key in self.dict()?.keys() {
            let position = key
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .and_then(|digits| digits.parse::<usize>().ok());
            if matches!(position, Some(n) if n == 0 || n > MAX_PARAMETERS) {
                if let Some(doc) = self.maybe_at(key)? {
                    return Err(doc.unexpected_value(format!("'{key}' is out of range")));
                }
            }
        }

        let mut docs = Vec::new();
        let mut gap = false;
        for n in 1..=MAX_PARAMETERS {
            let key = format!("{prefix}{n}{suffix}");
            match self.maybe_at(&key)? {
                Some(doc) if gap => {
                    return Err(doc.unexpected_value(format!("'{key}' is out of sequence")));
                }
                Some(doc) => docs.push(doc),
                None => gap = true,
            }
        }
        Ok(docs)
    }
}

/// Types that can be decoded from a document node.
pub trait FromDocument: Sized {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self>;
}

/// Decode a whole document as `T`.
pub fn decode<T: FromDocument>(value: &Json) -> DecodeResult<T> {
    T::from_document(&Doc::root(value))
}

/// Decode a sheet document: either `{"variables": [...]}` or a bare list.
pub fn decode_variables(value: &Json) -> DecodeResult<Vec<Variable>> {
    let doc = Doc::root(value);
    match value {
        Json::Array(_) => doc.list()?.iter().map(Variable::from_document).collect(),
        _ => doc.list_at("variables"),
    }
}

// ============================================================================
// Values and dice
// ============================================================================

impl FromDocument for String {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(doc.text()?.to_string())
    }
}

impl FromDocument for EngineValueType {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let name = doc.text()?;
        name.parse().map_err(|_| doc.unexpected_value(format!("'{name}'")))
    }
}

impl FromDocument for EngineValue {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let case = doc.case()?;
        Ok(match case {
            "engine_value_number" => EngineValue::Number(doc.at("value")?.number()?),
            "engine_value_text" => EngineValue::Text(doc.text_at("value")?),
            "engine_value_boolean" => EngineValue::Boolean(doc.at("value")?.boolean()?),
            "engine_value_dice_roll" => EngineValue::DiceRoll(doc.decode_at("value")?),
            "engine_value_list_text" => EngineValue::ListText(doc.list_at("value")?),
            other => return Err(doc.unknown_case(other)),
        })
    }
}

impl FromDocument for DiceRoll {
    /// Either dice notation text (`"2d6+3"`) or a dict of `quantities`,
    /// `modifiers` and an optional `name`.
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        if let Json::String(notation) = doc.raw() {
            return DiceRoll::parse(notation).map_err(|e| doc.unexpected_value(e));
        }
        let mut roll = DiceRoll::new();
        if let Some(quantities) = doc.maybe_at("quantities")? {
            for q in quantities.list()? {
                let sides = int32(&q.at("sides")?)?;
                let quantity = int32(&q.at("quantity")?)?;
                roll = roll.with_dice(quantity, sides);
            }
        }
        if let Some(modifiers) = doc.maybe_at("modifiers")? {
            for m in modifiers.list()? {
                let value = m.at("value")?.number()?;
                let modifier = match m.maybe_text_at("name")? {
                    Some(name) => RollModifier::named(value, name),
                    None => RollModifier::new(value),
                };
                roll.modifiers.insert(modifier);
            }
        }
        if let Some(name) = doc.maybe_text_at("name")? {
            roll = roll.with_name(name);
        }
        roll.validate().map_err(|e| doc.unexpected_value(e))?;
        Ok(roll)
    }
}

fn int32(doc: &Doc<'_>) -> DecodeResult<i32> {
    let n = doc.integer()?;
    i32::try_from(n).map_err(|_| doc.unexpected_value(n))
}

// ============================================================================
// Variables and references
// ============================================================================

impl FromDocument for VariableId {
    /// Plain text, or a dict with `name` and an optional `namespace`.
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        match doc.raw() {
            Json::String(name) => Ok(VariableId::new(name.as_str())),
            _ => Ok(VariableId {
                namespace: doc.maybe_text_at("namespace")?,
                name: doc.text_at("name")?,
            }),
        }
    }
}

impl FromDocument for VariableReference {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        match doc.case()? {
            "variable_id" => Ok(VariableReference::Id(doc.decode_at("value")?)),
            "variable_tag" => Ok(VariableReference::Tag(VariableTag::new(doc.text_at("value")?))),
            other => Err(doc.unknown_case(other)),
        }
    }
}

impl FromDocument for ValueReference {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(ValueReference::new(doc.text_at("value_set_id")?, doc.text_at("value_id")?))
    }
}

impl FromDocument for BooleanReference {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        match doc.case()? {
            "boolean_literal" => Ok(BooleanReference::Literal(doc.at("value")?.boolean()?)),
            "variable_reference" => Ok(BooleanReference::Variable(doc.decode_at("value")?)),
            other => Err(doc.unknown_case(other)),
        }
    }
}

impl FromDocument for NumberReference {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        match doc.case()? {
            "number_literal" => Ok(NumberReference::Literal(doc.at("value")?.number()?)),
            "variable_reference" => Ok(NumberReference::Variable(doc.decode_at("value")?)),
            "value_reference" => Ok(NumberReference::Value(doc.decode_at("value")?)),
            other => Err(doc.unknown_case(other)),
        }
    }
}

impl FromDocument for DiceRollReference {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        match doc.case()? {
            "dice_roll_literal" => Ok(DiceRollReference::Literal(doc.decode_at("value")?)),
            "variable_reference" => Ok(DiceRollReference::Variable(doc.decode_at("value")?)),
            other => Err(doc.unknown_case(other)),
        }
    }
}

impl FromDocument for DataReference {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        match doc.case()? {
            "data_reference_boolean" => Ok(DataReference::Boolean(doc.decode_at("value")?)),
            "data_reference_number" => Ok(DataReference::Number(doc.decode_at("value")?)),
            "data_reference_dice_roll" => Ok(DataReference::DiceRoll(doc.decode_at("value")?)),
            other => Err(doc.unknown_case(other)),
        }
    }
}

impl FromDocument for Invocation {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(Invocation {
            program_id: ProgramId::new(doc.text_at("program_id")?),
            arguments: doc.parameters()?,
        })
    }
}

fn boolean_value(doc: &Doc<'_>) -> DecodeResult<BooleanVariableValue> {
    match doc.case()? {
        "boolean_literal" => Ok(BooleanVariableValue::Literal(doc.at("value")?.boolean()?)),
        "program_invocation" => Ok(BooleanVariableValue::Program(doc.decode_at("value")?)),
        other => Err(doc.unknown_case(other)),
    }
}

fn number_value(doc: &Doc<'_>) -> DecodeResult<NumberVariableValue> {
    match doc.case()? {
        "number_literal" => Ok(NumberVariableValue::Literal(doc.at("value")?.number()?)),
        "unknown_literal_value" => Ok(NumberVariableValue::Unknown),
        "variable_id" => Ok(NumberVariableValue::Variable(doc.decode_at("value")?)),
        "program_invocation" => Ok(NumberVariableValue::Program(doc.decode_at("value")?)),
        "value_reference" => Ok(NumberVariableValue::Value(doc.decode_at("value")?)),
        "summation_id" => Ok(NumberVariableValue::Summation(SummationId::new(doc.text_at("value")?))),
        other => Err(doc.unknown_case(other)),
    }
}

fn text_value(doc: &Doc<'_>) -> DecodeResult<TextVariableValue> {
    match doc.case()? {
        "text_literal" => Ok(TextVariableValue::Literal(doc.text_at("value")?)),
        "unknown_literal_value" => Ok(TextVariableValue::Unknown),
        "value_reference" => Ok(TextVariableValue::Value(doc.decode_at("value")?)),
        "program_invocation" => Ok(TextVariableValue::Program(doc.decode_at("value")?)),
        "value_set_id" => Ok(TextVariableValue::ValueSetChoice(ValueSetId::new(doc.text_at("value")?))),
        other => Err(doc.unknown_case(other)),
    }
}

fn dice_roll_value(doc: &Doc<'_>) -> DecodeResult<DiceRollVariableValue> {
    match doc.case()? {
        "dice_roll_literal" => Ok(DiceRollVariableValue::Literal(doc.decode_at("value")?)),
        other => Err(doc.unknown_case(other)),
    }
}

impl FromDocument for HistoryEntry {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(HistoryEntry {
            value: number_value(&doc.at("value")?)?,
            description: doc.maybe_text_at("description")?,
        })
    }
}

impl FromDocument for Variable {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let value = match doc.case()? {
            "variable_boolean" => VariableValue::Boolean(boolean_value(&doc.at("value")?)?),
            "variable_number" => VariableValue::Number(number_value(&doc.at("value")?)?),
            "variable_text" => VariableValue::Text(text_value(&doc.at("value")?)?),
            "variable_dice_roll" => VariableValue::DiceRoll(dice_roll_value(&doc.at("value")?)?),
            other => return Err(doc.unknown_case(other)),
        };

        let mut variable = Variable::new(doc.decode_at::<VariableId>("id")?, doc.text_at("label")?, value);
        if let Some(description) = doc.maybe_text_at("description")? {
            variable = variable.with_description(description);
        }
        for tag in doc.list_at::<String>("tags")? {
            variable = variable.with_tag(tag);
        }
        if let Some(history) = doc.maybe_at("history")? {
            let entries = history
                .list()?
                .iter()
                .map(HistoryEntry::from_document)
                .collect::<DecodeResult<Vec<_>>>()?;
            variable = variable
                .with_history(NumberVariableHistory::from_entries(entries))
                .map_err(|e| history.unexpected_value(e))?;
        }
        Ok(variable)
    }
}

// ============================================================================
// Rule content
// ============================================================================

impl FromDocument for RulebookReference {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(RulebookReference {
            chapter: doc.text_at("chapter")?,
            section: doc.maybe_text_at("section")?,
            subsection: doc.maybe_text_at("subsection")?,
        })
    }
}

impl FromDocument for Value {
    /// The owning set id is optional here; sets rebind their values.
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let payload = match doc.case()? {
            "value_number" => ValuePayload::Number(doc.at("value")?.number()?),
            "value_text" => ValuePayload::Text(doc.text_at("value")?),
            other => return Err(doc.unknown_case(other)),
        };
        let set_id = doc.maybe_text_at("value_set_id")?.unwrap_or_default();
        let mut value = Value::new(set_id, ValueId::new(doc.text_at("value_id")?), payload);
        if let Some(description) = doc.maybe_text_at("description")? {
            value = value.with_description(description);
        }
        if let Some(reference) = doc.maybe_decode_at::<RulebookReference>("rulebook_reference")? {
            value = value.with_reference(reference);
        }
        value.variables = doc.list_at("variables")?;
        Ok(value)
    }
}

impl FromDocument for ValueSet {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let id = ValueSetId::new(doc.text_at("value_set_id")?);
        let label = doc.text_at("label")?;
        let mut set = match doc.case()? {
            "value_set_base" => doc
                .list_at::<Value>("values")?
                .into_iter()
                .fold(ValueSet::base(id, label), ValueSet::with_value),
            "value_set_compound" => doc
                .list_at::<String>("value_set_ids")?
                .into_iter()
                .fold(ValueSet::compound(id, label), ValueSet::with_member),
            other => return Err(doc.unknown_case(other)),
        };
        if let Some(singular) = doc.maybe_text_at("label_singular")? {
            set = set.with_singular(singular);
        }
        if let Some(description) = doc.maybe_text_at("description")? {
            set = set.with_description(description);
        }
        if let Some(value_type) = doc.maybe_decode_at::<EngineValueType>("value_type")? {
            set = set.with_value_type(value_type);
        }
        Ok(set)
    }
}

impl FromDocument for SummationTerm {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let term = match doc.case()? {
            "summation_term_number" => SummationTerm::number(doc.decode_at("value")?),
            "summation_term_dice_roll" => SummationTerm::dice_roll(doc.decode_at("value")?),
            "summation_term_conditional" => SummationTerm::conditional(
                doc.decode_at("condition")?,
                doc.decode_at("when_true")?,
                doc.decode_at("when_false")?,
            ),
            other => return Err(doc.unknown_case(other)),
        };
        Ok(match doc.maybe_text_at("term_name")? {
            Some(name) => term.named(name),
            None => term,
        })
    }
}

impl FromDocument for Summation {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let summation = Summation::new(SummationId::new(doc.text_at("summation_id")?), doc.text_at("name")?);
        Ok(doc
            .list_at::<SummationTerm>("terms")?
            .into_iter()
            .fold(summation, Summation::with_term))
    }
}

impl FromDocument for TypeSignature {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let parameters = doc
            .positional("parameter", "_type")?
            .iter()
            .map(EngineValueType::from_document)
            .collect::<DecodeResult<Vec<_>>>()?;
        Ok(TypeSignature::new(parameters, doc.decode_at("result_type")?))
    }
}

impl FromDocument for Tuple {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(Tuple {
            parameters: doc.parameters()?,
            result: doc.decode_at("result")?,
        })
    }
}

impl FromDocument for Function {
    /// Tuples are checked against the signature.
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let mut function = Function::new(
            FunctionId::new(doc.text_at("function_id")?),
            doc.decode_at("type_signature")?,
        );
        if let Some(label) = doc.maybe_text_at("label")? {
            function = function.with_label(label);
        }
        if let Some(description) = doc.maybe_text_at("description")? {
            function = function.with_description(description);
        }
        if let Some(tuples) = doc.maybe_at("tuples")? {
            for tuple_doc in tuples.list()? {
                let tuple = Tuple::from_document(&tuple_doc)?;
                function
                    .signature
                    .check_arguments(&function.id, &tuple.parameters)
                    .and_then(|_| function.signature.check_result(&function.id, &tuple.result))
                    .map_err(|e| tuple_doc.unexpected_value(e))?;
                function = function.with_tuple(tuple);
            }
        }
        Ok(function)
    }
}

impl FromDocument for StatementParameter {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        match doc.case()? {
            "statement_binding" => Ok(StatementParameter::Binding(BindingName::new(doc.text_at("value")?))),
            "program_parameter_index" => {
                let index_doc = doc.at("value")?;
                let index = index_doc.integer()?;
                usize::try_from(index)
                    .map(StatementParameter::ProgramParameter)
                    .map_err(|_| index_doc.unexpected_value(index))
            }
            "data_reference" => Ok(StatementParameter::Reference(doc.decode_at("value")?)),
            other => Err(doc.unknown_case(other)),
        }
    }
}

impl FromDocument for Statement {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(Statement {
            binding: BindingName::new(doc.text_at("binding_name")?),
            function_id: FunctionId::new(doc.text_at("function_id")?),
            parameters: doc.parameters()?,
        })
    }
}

impl FromDocument for Program {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let mut program = Program::new(
            ProgramId::new(doc.text_at("program_id")?),
            doc.decode_at("type_signature")?,
            BindingName::new(doc.text_at("result_binding_name")?),
        );
        if let Some(label) = doc.maybe_text_at("label")? {
            program = program.with_label(label);
        }
        if let Some(description) = doc.maybe_text_at("description")? {
            program = program.with_description(description);
        }
        Ok(doc
            .list_at::<Statement>("statements")?
            .into_iter()
            .fold(program, Program::with_statement))
    }
}

impl FromDocument for Mechanic {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        Ok(Mechanic {
            id: MechanicId::new(doc.text_at("mechanic_id")?),
            label: doc.text_at("label")?,
            description: doc.maybe_text_at("description")?.unwrap_or_default(),
            summary: doc.maybe_text_at("summary")?.unwrap_or_default(),
            category_id: doc.maybe_text_at("category_id")?.map(MechanicCategoryId::new),
            requirements: doc.list_at("requirements")?,
            variables: doc.list_at("variables")?,
        })
    }
}

impl FromDocument for Rulebook {
    fn from_document(doc: &Doc<'_>) -> DecodeResult<Self> {
        let mut rulebook = Rulebook::new().with_name(doc.maybe_text_at("name")?.unwrap_or_default());
        for set in doc.list_at::<ValueSet>("value_sets")? {
            rulebook.add_value_set(set);
        }
        for function in doc.list_at::<Function>("functions")? {
            rulebook.add_function(function);
        }
        for program in doc.list_at::<Program>("programs")? {
            rulebook.add_program(program);
        }
        for summation in doc.list_at::<Summation>("summations")? {
            rulebook.add_summation(summation);
        }
        for mechanic in doc.list_at::<Mechanic>("mechanics")? {
            rulebook.add_mechanic(mechanic);
        }
        Ok(rulebook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_value() {
        assert_eq!(
            decode::<EngineValue>(&json!({"case": "engine_value_number", "value": 5})),
            Ok(EngineValue::Number(5.0))
        );
        assert_eq!(
            decode::<EngineValue>(&json!({"case": "engine_value_list_text", "value": ["a", "b"]})),
            Ok(EngineValue::ListText(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_unknown_case_has_path() {
        let err = decode::<Rulebook>(&json!({
            "functions": [{
                "function_id": "f",
                "type_signature": {"result_type": "number"},
                "tuples": [{"result": {"case": "engine_value_integer", "value": 1}}]
            }]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownCase {
                path: DocPath::default().key("functions").index(0).key("tuples").index(0).key("result").key("case"),
                case: "engine_value_integer".into(),
            }
        );
        assert_eq!(err.path().to_string(), "$.functions[0].tuples[0].result.case");
    }

    #[test]
    fn test_unexpected_type() {
        let err = decode::<DiceRoll>(&json!({"quantities": [{"sides": "six", "quantity": 1}]})).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedType {
                expected: DocType::Number,
                found: DocType::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_dice_roll_forms() {
        let from_dict = decode::<DiceRoll>(&json!({
            "quantities": [{"sides": 6, "quantity": 2}],
            "modifiers": [{"value": 3, "name": "Strength"}]
        }))
        .unwrap();
        assert_eq!(from_dict.to_string(), "2d6+3");
        let from_text = decode::<DiceRoll>(&json!("1d20+5")).unwrap();
        assert_eq!(from_text.to_string(), "1d20+5");
        assert!(matches!(
            decode::<DiceRoll>(&json!({"quantities": [{"sides": 0, "quantity": 1}]})),
            Err(DecodeError::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn test_variable() {
        let variable = decode::<Variable>(&json!({
            "case": "variable_number",
            "id": {"namespace": "stats", "name": "str"},
            "label": "Strength",
            "tags": ["ability"],
            "value": {"case": "number_literal", "value": 16},
            "history": [{"value": {"case": "number_literal", "value": 15}, "description": "rolled"}]
        }))
        .unwrap();
        assert_eq!(variable.id, VariableId::qualified("stats", "str"));
        assert!(variable.has_tag(&VariableTag::new("ability")));
        assert_eq!(variable.history().len(), 1);

        let err = decode::<Variable>(&json!({
            "case": "variable_boolean",
            "id": "flag",
            "label": "Flag",
            "value": {"case": "boolean_literal", "value": true},
            "history": [{"value": {"case": "number_literal", "value": 1}}]
        }))
        .unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedValue { .. }));
    }

    #[test]
    fn test_parameters_must_be_contiguous() {
        let err = decode::<Invocation>(&json!({
            "program_id": "p",
            "parameter1": {"case": "data_reference_number", "value": {"case": "number_literal", "value": 1}},
            "parameter3": {"case": "data_reference_number", "value": {"case": "number_literal", "value": 3}}
        }))
        .unwrap_err();
        assert_eq!(err.path().to_string(), "$.parameter3");
    }

    #[test]
    fn test_parameters_past_the_limit_are_rejected() {
        let literal = json!({"case": "data_reference_number", "value": {"case": "number_literal", "value": 1}});
        let err = decode::<Invocation>(&json!({
            "program_id": "p",
            "parameter1": literal.clone(),
            "parameter7": literal.clone()
        }))
        .unwrap_err();
        assert_eq!(err.path().to_string(), "$.parameter7");
        assert!(matches!(err, DecodeError::UnexpectedValue { .. }));

        let err = decode::<TypeSignature>(&json!({
            "parameter1_type": "number",
            "parameter9_type": "number",
            "result_type": "number"
        }))
        .unwrap_err();
        assert_eq!(err.path().to_string(), "$.parameter9_type");

        let five = decode::<Invocation>(&json!({
            "program_id": "p",
            "parameter1": literal.clone(),
            "parameter2": literal.clone(),
            "parameter3": literal.clone(),
            "parameter4": literal.clone(),
            "parameter5": literal
        }))
        .unwrap();
        assert_eq!(five.arguments.len(), 5);
    }

    #[test]
    fn test_missing_key() {
        let err = decode::<Summation>(&json!({"summation_id": "ac"})).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingKey {
                path: DocPath::default(),
                key: "name".into(),
            }
        );
    }

    #[test]
    fn test_function_tuples_checked() {
        let err = decode::<Function>(&json!({
            "function_id": "neg",
            "type_signature": {"parameter1_type": "number", "result_type": "number"},
            "tuples": [{
                "parameter1": {"case": "engine_value_number", "value": 1},
                "result": {"case": "engine_value_text", "value": "-1"}
            }]
        }))
        .unwrap_err();
        assert_eq!(err.path().to_string(), "$.tuples[0]");
    }

    #[test]
    fn test_compound_value_set() {
        let set = decode::<ValueSet>(&json!({
            "case": "value_set_compound",
            "value_set_id": "weapons",
            "label": "Weapons",
            "label_singular": "Weapon",
            "value_set_ids": ["simple", "martial", "simple"]
        }))
        .unwrap();
        assert!(set.is_compound());
        assert_eq!(set.label_singular, "Weapon");
    }
}
