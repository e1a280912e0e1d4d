use serde::{Deserialize, Serialize};

use curator_core::{DomainResult, Entity, TemplateId};

use crate::text;

/// Reusable description of a kind of asset (not a physical item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    pub id: TemplateId,
    pub asset_code: String,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub color: Option<String>,
    pub dimensions: Option<String>,
    pub other: Option<String>,
    pub origin: Option<String>,
}

impl Entity for ItemTemplate {
    type Id = TemplateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Fields accepted when creating a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewItemTemplate {
    pub asset_code: String,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub color: Option<String>,
    pub dimensions: Option<String>,
    pub other: Option<String>,
    pub origin: Option<String>,
}

impl NewItemTemplate {
    pub fn new(asset_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            asset_code: asset_code.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Reject blank required fields.
    pub fn validate(&self) -> DomainResult<()> {
        text::required("assetCode", &self.asset_code)?;
        text::required("name", &self.name)?;
        Ok(())
    }

    /// Validate and normalize into a persisted template with the given id.
    pub fn into_template(self, id: TemplateId) -> DomainResult<ItemTemplate> {
        Ok(ItemTemplate {
            id,
            asset_code: text::required("assetCode", &self.asset_code)?,
            name: text::required("name", &self.name)?,
            brand: text::optional(self.brand),
            model: text::optional(self.model),
            item_type: text::optional(self.item_type),
            color: text::optional(self.color),
            dimensions: text::optional(self.dimensions),
            other: text::optional(self.other),
            origin: text::optional(self.origin),
        })
    }
}

/// Partial update for a template.
///
/// `None` leaves a field unchanged. For optional attributes, `Some` carrying a
/// blank string clears the attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplatePatch {
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub other: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

impl ItemTemplatePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Reject patches that would blank a required field.
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(code) = &self.asset_code {
            text::required("assetCode", code)?;
        }
        if let Some(name) = &self.name {
            text::required("name", name)?;
        }
        Ok(())
    }

    /// Apply the patch in place. Fails without touching `template` if the
    /// patch is invalid.
    pub fn apply(&self, template: &mut ItemTemplate) -> DomainResult<()> {
        self.validate()?;

        if let Some(code) = &self.asset_code {
            template.asset_code = text::required("assetCode", code)?;
        }
        if let Some(name) = &self.name {
            template.name = text::required("name", name)?;
        }

        let optional_fields = [
            (&self.brand, &mut template.brand),
            (&self.model, &mut template.model),
            (&self.item_type, &mut template.item_type),
            (&self.color, &mut template.color),
            (&self.dimensions, &mut template.dimensions),
            (&self.other, &mut template.other),
            (&self.origin, &mut template.origin),
        ];
        for (patch, slot) in optional_fields {
            if let Some(value) = patch {
                *slot = text::optional(Some(value.clone()));
            }
        }

        Ok(())
    }

    /// Normalized `(field, value)` pairs for the fields this patch sets, in
    /// declaration order. A store can write exactly these and nothing else.
    pub fn changes(&self) -> DomainResult<Vec<(&'static str, Option<String>)>> {
        let mut changes = Vec::new();
        if let Some(code) = &self.asset_code {
            changes.push(("asset_code", Some(text::required("assetCode", code)?)));
        }
        if let Some(name) = &self.name {
            changes.push(("name", Some(text::required("name", name)?)));
        }

        let optional_fields = [
            ("brand", &self.brand),
            ("model", &self.model),
            ("item_type", &self.item_type),
            ("color", &self.color),
            ("dimensions", &self.dimensions),
            ("other", &self.other),
            ("origin", &self.origin),
        ];
        for (field, value) in optional_fields {
            if let Some(value) = value {
                changes.push((field, text::optional(Some(value.clone()))));
            }
        }

        Ok(changes)
    }
}

impl ItemTemplate {
    /// Apply a patch, returning the updated copy.
    pub fn patched(&self, patch: &ItemTemplatePatch) -> DomainResult<ItemTemplate> {
        let mut next = self.clone();
        patch.apply(&mut next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_core::DomainError;

    fn chair() -> ItemTemplate {
        NewItemTemplate {
            brand: Some("Thonet".to_string()),
            ..NewItemTemplate::new("A1", "Chair")
        }
        .into_template(TemplateId::new())
        .unwrap()
    }

    #[test]
    fn create_requires_asset_code_and_name() {
        let err = NewItemTemplate::new("", "Chair")
            .into_template(TemplateId::new())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("assetCode cannot be empty"));

        let err = NewItemTemplate::new("A1", "  ")
            .into_template(TemplateId::new())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn create_stores_blank_optionals_as_none() {
        let t = NewItemTemplate {
            color: Some(String::new()),
            origin: Some("Vienna".to_string()),
            ..NewItemTemplate::new("A1", "Chair")
        }
        .into_template(TemplateId::new())
        .unwrap();

        assert_eq!(t.color, None);
        assert_eq!(t.origin.as_deref(), Some("Vienna"));
    }

    #[test]
    fn patch_leaves_absent_fields_unchanged() {
        let t = chair();
        let patch = ItemTemplatePatch {
            model: Some("No. 14".to_string()),
            ..Default::default()
        };

        let next = t.patched(&patch).unwrap();
        assert_eq!(next.brand.as_deref(), Some("Thonet"));
        assert_eq!(next.model.as_deref(), Some("No. 14"));
        assert_eq!(next.name, "Chair");
    }

    #[test]
    fn patch_with_blank_optional_clears_it() {
        let t = chair();
        let patch = ItemTemplatePatch {
            brand: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(t.patched(&patch).unwrap().brand, None);
    }

    #[test]
    fn patch_cannot_blank_name() {
        let t = chair();
        let patch = ItemTemplatePatch {
            name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(t.patched(&patch), Err(DomainError::Validation(_))));
    }

    #[test]
    fn changes_list_only_set_fields_normalized() {
        let patch = ItemTemplatePatch {
            name: Some(" Bentwood chair ".to_string()),
            color: Some("  ".to_string()),
            item_type: Some("Seating".to_string()),
            ..Default::default()
        };

        assert_eq!(
            patch.changes().unwrap(),
            vec![
                ("name", Some("Bentwood chair".to_string())),
                ("item_type", Some("Seating".to_string())),
                ("color", None),
            ]
        );
        assert!(ItemTemplatePatch::default().changes().unwrap().is_empty());

        let blank_code = ItemTemplatePatch {
            asset_code: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(blank_code.changes(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn serde_uses_type_for_item_type() {
        let json = serde_json::to_value(chair()).unwrap();
        assert!(json.get("type").is_some());
        assert!(json.get("assetCode").is_some());
    }
}
