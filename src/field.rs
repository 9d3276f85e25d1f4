use serde::{Deserialize, Deserializer};

/// One mutable field in a partial update.
///
/// A key missing from the request body is `Unset` and leaves the stored value
/// alone. For nullable columns use `FieldUpdate<Option<T>>`, where an explicit
/// `null` becomes `SetTo(None)` and clears the value. Fields using this type
/// need `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Unset,
    SetTo(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, FieldUpdate::SetTo(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::SetTo(v) => Some(v),
            FieldUpdate::Unset => None,
        }
    }

    /// Writes the new value into `target`. Returns whether anything was written.
    pub fn apply(self, target: &mut T) -> bool {
        match self {
            FieldUpdate::SetTo(v) => {
                *target = v;
                true
            }
            FieldUpdate::Unset => false,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(FieldUpdate::SetTo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default)]
        name: FieldUpdate<String>,
        #[serde(default)]
        phone: FieldUpdate<Option<String>>,
    }

    #[test]
    fn absent_key_is_unset() {
        let p: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(p.name, FieldUpdate::Unset);
        assert_eq!(p.phone, FieldUpdate::Unset);
    }

    #[test]
    fn null_clears_nullable_field() {
        let p: Patch = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(p.phone, FieldUpdate::SetTo(None));

        let mut phone = Some("555-0100".to_string());
        assert!(p.phone.apply(&mut phone));
        assert_eq!(phone, None);
    }

    #[test]
    fn null_on_required_field_is_rejected() {
        assert!(serde_json::from_str::<Patch>(r#"{"name": null}"#).is_err());
    }

    #[test]
    fn unset_leaves_target_untouched() {
        let mut name = "Jane".to_string();
        assert!(!FieldUpdate::<String>::Unset.apply(&mut name));
        assert_eq!(name, "Jane");
    }
}
