//! Form parsing and validation.
//!
//! Handlers parse the urlencoded body into [`FormData`], hand it to a form's
//! `validate`, and either get clean typed fields back or a [`BoundForm`] that
//! re-renders with the submitted values and per-field errors.

pub mod account;
pub mod exercise;
pub mod rewards;
pub mod workout;

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Key for errors that belong to the whole form rather than one field.
pub const NON_FIELD: &str = "__all__";

pub const REQUIRED: &str = "Ce champ est obligatoire.";
pub const INVALID_CHOICE: &str =
    "Sélectionnez un choix valide. Ce choix ne fait pas partie de ceux disponibles.";

/// Largest value an integer field accepts, as for a 32-bit database column.
pub const MAX_INTEGER: i64 = i32::MAX as i64;

/// Submitted key/value pairs in order. Keys may repeat (multi-selects).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn from_bytes(body: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value for `name`, trimmed. Empty when absent.
    pub fn get(&self, name: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
            .unwrap_or("")
    }

    /// First value for `name`, untrimmed. Used for passwords.
    pub fn raw(&self, name: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Drop a key, e.g. so passwords are never echoed back into a page.
    pub fn without(mut self, name: &str) -> Self {
        self.pairs.retain(|(k, _)| k != name);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    /// Remove and return the field's errors.
    pub fn take(&mut self, field: &str) -> Vec<String> {
        self.fields.remove(field).unwrap_or_default()
    }
}

/// One `<option>` of a select, already marked when it matches the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// A form as shown on a page: what the user typed plus what went wrong.
#[derive(Debug, Clone, Default)]
pub struct BoundForm {
    pub data: FormData,
    pub errors: FormErrors,
}

impl BoundForm {
    pub fn new(data: FormData, errors: FormErrors) -> Self {
        Self { data, errors }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn initial(data: FormData) -> Self {
        Self {
            data,
            errors: FormErrors::default(),
        }
    }

    pub fn value(&self, name: &str) -> &str {
        self.data.get(name)
    }

    pub fn is_selected(&self, name: &str, value: &str) -> bool {
        self.data.get_all(name).contains(&value)
    }

    /// Options for `field`, marking the ones the form currently holds.
    pub fn choices<V, L>(&self, field: &str, options: impl IntoIterator<Item = (V, L)>) -> Vec<Choice>
    where
        V: ToString,
        L: Into<String>,
    {
        options
            .into_iter()
            .map(|(value, label)| {
                let value = value.to_string();
                Choice {
                    selected: self.is_selected(field, &value),
                    value,
                    label: label.into(),
                }
            })
            .collect()
    }

    pub fn errors_for(&self, name: &str) -> Vec<String> {
        self.errors.get(name).to_vec()
    }

    pub fn non_field_errors(&self) -> Vec<String> {
        self.errors.get(NON_FIELD).to_vec()
    }

    fn field(&self, name: &str, label: &str, widget: Widget) -> Field {
        Field {
            name: name.to_string(),
            label: label.to_string(),
            value: self.value(name).to_string(),
            errors: self.errors_for(name),
            widget,
            choices: Vec::new(),
        }
    }

    /// `<input>` of the given HTML type.
    pub fn input(&self, name: &str, label: &str, input_type: &'static str) -> Field {
        self.field(name, label, Widget::Input(input_type))
    }

    /// Password inputs never carry the submitted value back.
    pub fn password(&self, name: &str, label: &str) -> Field {
        Field {
            value: String::new(),
            ..self.field(name, label, Widget::Input("password"))
        }
    }

    pub fn textarea(&self, name: &str, label: &str) -> Field {
        self.field(name, label, Widget::TextArea)
    }

    /// Single select with a leading blank option.
    pub fn select(&self, name: &str, label: &str, choices: Vec<Choice>) -> Field {
        let mut all = vec![Choice {
            value: String::new(),
            label: "---------".to_string(),
            selected: self.value(name).is_empty(),
        }];
        all.extend(choices);
        Field {
            choices: all,
            ..self.field(name, label, Widget::Select)
        }
    }

    pub fn checkboxes(&self, name: &str, label: &str, choices: Vec<Choice>) -> Field {
        Field {
            choices,
            ..self.field(name, label, Widget::Checkboxes)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Input(&'static str),
    TextArea,
    Select,
    Checkboxes,
}

/// One rendered form field: everything a template needs, nothing to compute.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub value: String,
    pub errors: Vec<String>,
    pub widget: Widget,
    pub choices: Vec<Choice>,
}

impl Field {
    pub fn input_type(&self) -> &'static str {
        match self.widget {
            Widget::Input(kind) => kind,
            _ => "",
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.widget, Widget::Input(_))
    }

    pub fn is_textarea(&self) -> bool {
        self.widget == Widget::TextArea
    }

    pub fn is_select(&self) -> bool {
        self.widget == Widget::Select
    }

    pub fn is_checkboxes(&self) -> bool {
        self.widget == Widget::Checkboxes
    }
}

/// Field-by-field reader that collects every error before giving up, so the
/// user sees all problems in one round trip.
pub struct Validator<'a> {
    data: &'a FormData,
    errors: FormErrors,
}

impl<'a> Validator<'a> {
    pub fn new(data: &'a FormData) -> Self {
        Self {
            data,
            errors: FormErrors::default(),
        }
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.has(field)
    }

    fn check_length(&mut self, field: &str, value: &str, max_len: usize) -> bool {
        let len = value.chars().count();
        if len > max_len {
            self.error(
                field,
                format!(
                    "Assurez-vous que cette valeur comporte au plus {max_len} caractères (actuellement {len})."
                ),
            );
            return false;
        }
        true
    }

    pub fn required(&mut self, field: &str, max_len: usize) -> String {
        let data = self.data;
        let value = data.get(field);
        if value.is_empty() {
            self.error(field, REQUIRED);
            return String::new();
        }
        self.check_length(field, value, max_len);
        value.to_string()
    }

    pub fn optional(&mut self, field: &str, max_len: usize) -> Option<String> {
        let data = self.data;
        let value = data.get(field);
        if value.is_empty() {
            return None;
        }
        self.check_length(field, value, max_len);
        Some(value.to_string())
    }

    /// Free text where empty is a valid value.
    pub fn text(&mut self, field: &str, max_len: usize) -> String {
        self.optional(field, max_len).unwrap_or_default()
    }

    /// Whole number in `min..=MAX_INTEGER`.
    pub fn integer(&mut self, field: &str, min: i64) -> i64 {
        let data = self.data;
        let value = data.get(field);
        if value.is_empty() {
            self.error(field, REQUIRED);
            return 0;
        }
        match value.parse::<i64>() {
            Ok(n) if n < min => {
                self.error(
                    field,
                    format!("Assurez-vous que cette valeur est supérieure ou égale à {min}."),
                );
                0
            }
            Ok(n) if n > MAX_INTEGER => {
                self.error(
                    field,
                    format!("Assurez-vous que cette valeur est inférieure ou égale à {MAX_INTEGER}."),
                );
                0
            }
            Ok(n) => n,
            Err(_) => {
                self.error(field, "Saisissez un nombre entier.");
                0
            }
        }
    }

    /// An id picked from a select. Existence is checked by the caller.
    pub fn choice_id(&mut self, field: &str) -> i64 {
        let data = self.data;
        let value = data.get(field);
        if value.is_empty() {
            self.error(field, REQUIRED);
            return 0;
        }
        match value.parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                self.error(field, INVALID_CHOICE);
                0
            }
        }
    }

    pub fn positive_decimal(&mut self, field: &str) -> Option<f64> {
        let data = self.data;
        let value = data.get(field);
        if value.is_empty() {
            return None;
        }
        match value.replace(',', ".").parse::<f64>() {
            Ok(n) if n.is_finite() && n > 0.0 => Some(n),
            Ok(_) => {
                self.error(field, "Assurez-vous que cette valeur est supérieure à 0.");
                None
            }
            Err(_) => {
                self.error(field, "Saisissez un nombre.");
                None
            }
        }
    }

    pub fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let data = self.data;
        let value = data.get(field);
        if value.is_empty() {
            return None;
        }
        match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.error(field, "Saisissez une date valide.");
                None
            }
        }
    }

    pub fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

/// URL-safe code for a name: lowercase ascii, accents folded, runs of spaces
/// and dashes collapsed to one dash.
pub fn slugify(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for c in value.to_lowercase().chars() {
        match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => folded.push('a'),
            'ç' => folded.push('c'),
            'è' | 'é' | 'ê' | 'ë' => folded.push('e'),
            'ì' | 'í' | 'î' | 'ï' => folded.push('i'),
            'ñ' => folded.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => folded.push('o'),
            'ù' | 'ú' | 'û' | 'ü' => folded.push('u'),
            'ý' | 'ÿ' => folded.push('y'),
            'œ' => folded.push_str("oe"),
            'æ' => folded.push_str("ae"),
            c if c.is_ascii_alphanumeric() || c == '_' => folded.push(c),
            c if c.is_whitespace() || c == '-' => folded.push('-'),
            _ => {}
        }
    }

    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_data_keeps_repeated_keys() {
        let data = FormData::from_bytes(b"badges=1&badges=3&nom=D%C3%A9fi+hiver");
        assert_eq!(data.get_all("badges"), vec!["1", "3"]);
        assert_eq!(data.get("nom"), "Défi hiver");
        assert_eq!(data.get("missing"), "");
    }

    #[test]
    fn validator_collects_every_error() {
        let data = FormData::from_pairs([("sets", "abc"), ("reps", "0")]);
        let mut v = Validator::new(&data);
        v.required("nom", 100);
        v.integer("sets", 1);
        v.integer("reps", 1);
        let errors = v.finish(()).unwrap_err();
        assert_eq!(errors.get("nom"), [REQUIRED.to_string()]);
        assert!(errors.has("sets"));
        assert!(errors.has("reps"));
    }

    #[test]
    fn integers_are_bounded_above() {
        let data = FormData::from_pairs([
            ("sets", MAX_INTEGER.to_string()),
            ("reps", (MAX_INTEGER + 1).to_string()),
            ("huge", "99999999999999999999".to_string()),
        ]);
        let mut v = Validator::new(&data);
        assert_eq!(v.integer("sets", 1), MAX_INTEGER);
        v.integer("reps", 1);
        v.integer("huge", 1);
        assert!(!v.has_error("sets"));
        assert!(v.has_error("reps"));
        assert!(v.has_error("huge"));
    }

    #[test]
    fn taking_errors_leaves_the_rest() {
        let mut errors = FormErrors::default();
        errors.add(NON_FIELD, "Non.");
        errors.add("nom", REQUIRED);
        assert_eq!(errors.take(NON_FIELD), vec!["Non.".to_string()]);
        assert!(errors.take(NON_FIELD).is_empty());
        assert!(errors.has("nom"));
    }

    #[test]
    fn validator_enforces_max_length() {
        let long = "x".repeat(101);
        let data = FormData::from_pairs([("nom", long.as_str())]);
        let mut v = Validator::new(&data);
        v.required("nom", 100);
        assert!(v.has_error("nom"));
    }

    #[test]
    fn decimals_accept_commas() {
        let data = FormData::from_pairs([("poids", "72,5")]);
        let mut v = Validator::new(&data);
        assert_eq!(v.positive_decimal("poids"), Some(72.5));
    }

    #[test]
    fn slugify_folds_accents_and_collapses_separators() {
        assert_eq!(slugify("Lève-tôt"), "leve-tot");
        assert_eq!(slugify("  Roi   du  Squat! "), "roi-du-squat");
        assert_eq!(slugify("100 pompes -- d'affilée"), "100-pompes-daffilee");
        assert_eq!(slugify("Cœur"), "coeur");
    }

    #[test]
    fn bound_form_reports_selection() {
        let form = BoundForm::initial(FormData::from_pairs([("badges", "2"), ("badges", "5")]));
        assert!(form.is_selected("badges", "5"));
        assert!(!form.is_selected("badges", "3"));

        let choices = form.choices("badges", [(2, "Deux"), (3, "Trois")]);
        assert!(choices[0].selected);
        assert!(!choices[1].selected);
        assert_eq!(choices[1].label, "Trois");
    }

    #[test]
    fn fields_carry_values_and_errors() {
        let mut errors = FormErrors::default();
        errors.add("nom", REQUIRED);
        let form = BoundForm::new(
            FormData::from_pairs([("nom", ""), ("password1", "secret"), ("groupe", "2")]),
            errors,
        );

        let name = form.input("nom", "Nom", "text");
        assert!(name.is_input());
        assert_eq!(name.input_type(), "text");
        assert_eq!(name.errors, vec![REQUIRED.to_string()]);

        assert_eq!(form.password("password1", "Mot de passe").value, "");

        let select = form.select("groupe", "Groupe", form.choices("groupe", [(1, "Un"), (2, "Deux")]));
        assert!(select.is_select());
        assert_eq!(select.choices.len(), 3);
        assert!(!select.choices[0].selected);
        assert!(select.choices[2].selected);
    }
}
