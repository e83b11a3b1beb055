#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    FreeText {
        max_len: usize,
    },
    /// Integer input limited to the range of a `bits`-wide integer.
    ConstrainedNumeric {
        bits: u8,
        signed: bool,
        max_len: usize,
    },
    /// Options are the values handed to the submit handler.
    Choice {
        options: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    #[must_use]
    pub const fn text(name: &'static str, max_len: usize) -> Self {
        Self {
            name,
            kind: FieldKind::FreeText { max_len },
        }
    }

    #[must_use]
    pub const fn numeric(name: &'static str, bits: u8, signed: bool, max_len: usize) -> Self {
        Self {
            name,
            kind: FieldKind::ConstrainedNumeric {
                bits,
                signed,
                max_len,
            },
        }
    }

    #[must_use]
    pub const fn choice(name: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::Choice { options },
        }
    }
}

/// Whether `candidate` may become the buffered text of a field of `kind`.
#[must_use]
pub fn admits(kind: FieldKind, candidate: &str) -> bool {
    match kind {
        FieldKind::FreeText { max_len } => candidate.chars().count() <= max_len,
        FieldKind::ConstrainedNumeric {
            bits,
            signed,
            max_len,
        } => candidate.chars().count() <= max_len && fits_integer(candidate, bits, signed),
        FieldKind::Choice { .. } => false,
    }
}

/// A lone `-` is admitted for signed fields so negative values can be typed.
fn fits_integer(candidate: &str, bits: u8, signed: bool) -> bool {
    if signed && candidate == "-" {
        return true;
    }
    let shift = 64 - u32::from(bits.clamp(1, 64));
    if signed {
        let max = i64::MAX >> shift;
        let min = -max - 1;
        candidate
            .parse::<i64>()
            .is_ok_and(|value| (min..=max).contains(&value))
    } else {
        let max = u64::MAX >> shift;
        candidate.parse::<u64>().is_ok_and(|value| value <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    spec: FieldSpec,
    text: String,
    selected: usize,
}

impl FormField {
    fn new(spec: FieldSpec) -> Self {
        Self {
            spec,
            text: String::new(),
            selected: 0,
        }
    }

    #[must_use]
    pub fn spec(&self) -> FieldSpec {
        self.spec
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// The buffered text, or the selected option for choice fields.
    #[must_use]
    pub fn value(&self) -> &str {
        match self.spec.kind {
            FieldKind::Choice { options } => options.get(self.selected).copied().unwrap_or(""),
            FieldKind::FreeText { .. } | FieldKind::ConstrainedNumeric { .. } => &self.text,
        }
    }

    #[must_use]
    pub fn is_choice(&self) -> bool {
        matches!(self.spec.kind, FieldKind::Choice { .. })
    }

    /// Position of the selected option. `None` for non-choice fields.
    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.is_choice().then_some(self.selected)
    }
}

/// Submitted values, looked up by declared field name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormValues {
    entries: Vec<(&'static str, String)>,
    choices: Vec<(&'static str, usize)>,
}

impl FormValues {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Index of the option picked in choice field `name`.
    #[must_use]
    pub fn choice(&self, name: &str) -> Option<usize> {
        self.choices
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, index)| *index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormItem {
    Field(usize),
    Button,
}

/// The input surface of the form area. A form with a notice has no fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    fields: Vec<FormField>,
    button_label: &'static str,
    focused: usize,
    notice: Option<&'static str>,
}

impl Form {
    #[must_use]
    pub fn build(fields: &[FieldSpec], button_label: &'static str) -> Self {
        Self {
            fields: fields.iter().copied().map(FormField::new).collect(),
            button_label,
            focused: 0,
            notice: None,
        }
    }

    #[must_use]
    pub fn notice(text: &'static str) -> Self {
        Self {
            fields: Vec::new(),
            button_label: text,
            focused: 0,
            notice: Some(text),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    #[must_use]
    pub fn button_label(&self) -> &'static str {
        self.button_label
    }

    #[must_use]
    pub fn notice_text(&self) -> Option<&'static str> {
        self.notice
    }

    #[must_use]
    pub fn focused_item(&self) -> FormItem {
        if self.focused < self.fields.len() {
            FormItem::Field(self.focused)
        } else {
            FormItem::Button
        }
    }

    pub fn focus_next(&mut self) {
        self.focused = (self.focused + 1) % (self.fields.len() + 1);
    }

    pub fn focus_previous(&mut self) {
        let items = self.fields.len() + 1;
        self.focused = (self.focused + items - 1) % items;
    }

    fn focused_field_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.focused)
    }

    /// Appends `ch` to the focused field if its filter admits the result.
    pub fn insert_char(&mut self, ch: char) -> bool {
        let Some(field) = self.focused_field_mut() else {
            return false;
        };

        let mut candidate = field.text.clone();
        candidate.push(ch);
        if !admits(field.spec.kind, &candidate) {
            return false;
        }
        field.text = candidate;
        true
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.focused_field_mut() {
            field.text.pop();
        }
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        let Some(field) = self.focused_field_mut() else {
            return;
        };
        let FieldKind::Choice { options } = field.spec.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        field.selected = if forward {
            (field.selected + 1) % options.len()
        } else {
            (field.selected + options.len() - 1) % options.len()
        };
    }

    #[must_use]
    pub fn values(&self) -> FormValues {
        FormValues {
            entries: self
                .fields
                .iter()
                .map(|field| (field.name(), field.value().to_string()))
                .collect(),
            choices: self
                .fields
                .iter()
                .filter_map(|field| Some((field.name(), field.selected_index()?)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{admits, FieldKind, FieldSpec, Form, FormItem};

    const FLAGS: FieldKind = FieldKind::ConstrainedNumeric {
        bits: 16,
        signed: false,
        max_len: 5,
    };
    const DELETE_ID: FieldKind = FieldKind::ConstrainedNumeric {
        bits: 16,
        signed: true,
        max_len: 8,
    };

    fn type_into(form: &mut Form, text: &str) -> usize {
        text.chars().filter(|ch| form.insert_char(*ch)).count()
    }

    #[test]
    fn flags_filter_accepts_exactly_unsigned_sixteen_bit_values() {
        assert!(admits(FLAGS, "0"));
        assert!(admits(FLAGS, "65535"));
        assert!(!admits(FLAGS, "65536"));
        assert!(!admits(FLAGS, "-1"));
        assert!(!admits(FLAGS, "4a"));
        assert!(!admits(FLAGS, ""));
    }

    #[test]
    fn delete_id_filter_accepts_signed_sixteen_bit_values() {
        assert!(admits(DELETE_ID, "-32768"));
        assert!(admits(DELETE_ID, "32767"));
        assert!(!admits(DELETE_ID, "32768"));
        assert!(!admits(DELETE_ID, "-32769"));
        assert!(admits(DELETE_ID, "-"));
        assert!(!admits(DELETE_ID, "--"));
        assert!(!admits(DELETE_ID, "7-"));
        assert!(!admits(FLAGS, "-"));
    }

    #[test]
    fn negative_ids_can_be_typed_key_by_key() {
        let mut form = Form::build(&[FieldSpec::numeric("ID", 16, true, 8)], "Execute");
        assert_eq!(type_into(&mut form, "-7"), 2);
        assert_eq!(form.values().get("ID"), Some("-7"));

        let mut form = Form::build(&[FieldSpec::numeric("ID", 16, true, 8)], "Execute");
        assert_eq!(type_into(&mut form, "-32768"), 6);
        assert_eq!(form.values().get("ID"), Some("-32768"));

        let mut form = Form::build(&[FieldSpec::numeric("ID", 16, true, 8)], "Execute");
        type_into(&mut form, "-32769");
        assert_eq!(form.values().get("ID"), Some("-3276"));
    }

    #[test]
    fn free_text_is_bounded_by_length_only() {
        let kind = FieldKind::FreeText { max_len: 3 };
        assert!(admits(kind, "a%_"));
        assert!(!admits(kind, "abcd"));
    }

    #[test]
    fn rejected_keystrokes_leave_the_buffer_untouched() {
        let mut form = Form::build(&[FieldSpec::numeric("flags", 16, false, 5)], "Execute");

        assert_eq!(type_into(&mut form, "6553"), 4);
        assert!(!form.insert_char('6'));
        assert!(!form.insert_char('x'));
        assert_eq!(form.values().get("flags"), Some("6553"));

        assert!(form.insert_char('5'));
        assert_eq!(form.values().get("flags"), Some("65535"));
    }

    #[test]
    fn focus_walks_fields_then_button_and_wraps() {
        let mut form = Form::build(
            &[FieldSpec::text("ckey", 32), FieldSpec::text("race", 32)],
            "Execute",
        );
        assert_eq!(form.focused_item(), FormItem::Field(0));
        form.focus_next();
        form.focus_next();
        assert_eq!(form.focused_item(), FormItem::Button);
        form.focus_next();
        assert_eq!(form.focused_item(), FormItem::Field(0));
        form.focus_previous();
        assert_eq!(form.focused_item(), FormItem::Button);
        assert!(!form.insert_char('x'));
    }

    #[test]
    fn values_keep_declared_order_and_choice_values() {
        let mut form = Form::build(
            &[
                FieldSpec::choice("Search By", &["ckey", "race"]),
                FieldSpec::text("Search Term", 32),
            ],
            "Search",
        );
        form.cycle_choice(true);
        form.focus_next();
        type_into(&mut form, "human");

        let values = form.values();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("Search By"), Some("race"));
        assert_eq!(values.get("Search Term"), Some("human"));
        assert_eq!(values.get("race"), None);
        assert_eq!(values.choice("Search By"), Some(1));
        assert_eq!(values.choice("Search Term"), None);

        form.focus_previous();
        form.cycle_choice(true);
        assert_eq!(form.values().get("Search By"), Some("ckey"));
        form.cycle_choice(false);
        assert_eq!(form.values().get("Search By"), Some("race"));
    }

    #[test]
    fn backspace_is_always_admitted() {
        let mut form = Form::build(&[FieldSpec::numeric("ID", 16, true, 8)], "Execute");
        type_into(&mut form, "7");
        form.backspace();
        assert_eq!(form.values().get("ID"), Some(""));
        form.backspace();
        assert_eq!(form.values().get("ID"), Some(""));
    }

    #[test]
    fn notice_forms_have_no_fields() {
        let form = Form::notice("Not Implemented. Perform in game.");
        assert!(form.fields().is_empty());
        assert!(form.values().is_empty());
        assert_eq!(form.focused_item(), FormItem::Button);
        assert_eq!(
            form.notice_text(),
            Some("Not Implemented. Perform in game.")
        );
    }
}
