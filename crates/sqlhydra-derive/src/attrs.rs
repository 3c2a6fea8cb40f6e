//! Attribute parsing for the Model derive macro.
//!
//! Handles struct-level `#[orm(table = "...")]` and field-level `#[orm(...)]` attributes.

use syn::{Attribute, DeriveInput, Field, Result};

/// Role of a field, as declared by its attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldKind {
    PrimaryKey,
    Column,
    /// Filled from the relation attached under this key.
    Relation(String),
    /// Not mapped; initialized with `Default`.
    Skip,
}

/// Parsed field-level attribute.
pub(crate) struct FieldAttr {
    pub kind: FieldKind,
    pub column: String,
}

#[derive(Default)]
struct RawFieldAttr {
    is_id: bool,
    skip: bool,
    relation: Option<Option<String>>,
    column: Option<String>,
}

impl syn::parse::Parse for RawFieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = RawFieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let value = if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                Some(input.parse::<syn::LitStr>()?.value())
            } else {
                None
            };

            match (ident.to_string().as_str(), value) {
                ("id", None) => attr.is_id = true,
                ("skip", None) => attr.skip = true,
                ("relation", key) => attr.relation = Some(key),
                ("column", Some(column)) => attr.column = Some(column),
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        "expected one of: id, column = \"...\", relation, relation = \"...\", skip",
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

fn orm_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident("orm"))
}

/// Parse the `#[orm(...)]` attributes of one named field.
pub(crate) fn field_attr(field: &Field) -> Result<FieldAttr> {
    let name = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "Model fields must be named"))?
        .to_string();

    let mut raw = RawFieldAttr::default();
    for attr in orm_attrs(&field.attrs) {
        let parsed: RawFieldAttr = attr.parse_args()?;
        raw.is_id |= parsed.is_id;
        raw.skip |= parsed.skip;
        raw.relation = parsed.relation.or(raw.relation);
        raw.column = parsed.column.or(raw.column);
    }

    let declared = [raw.is_id, raw.skip, raw.relation.is_some()]
        .iter()
        .filter(|d| **d)
        .count();
    if declared > 1 {
        return Err(syn::Error::new_spanned(
            field,
            "id, relation and skip are mutually exclusive",
        ));
    }

    let column = raw.column.unwrap_or_else(|| name.clone());
    let kind = if raw.is_id {
        FieldKind::PrimaryKey
    } else if raw.skip {
        FieldKind::Skip
    } else if let Some(key) = raw.relation {
        FieldKind::Relation(key.unwrap_or(name))
    } else {
        FieldKind::Column
    };
    Ok(FieldAttr { kind, column })
}

/// Extract table name from struct-level `#[orm(table = "...")]` attribute.
pub(crate) fn table_name(input: &DeriveInput) -> Result<Option<String>> {
    for attr in orm_attrs(&input.attrs) {
        let nested: syn::MetaNameValue = attr.parse_args()?;
        if !nested.path.is_ident("table") {
            return Err(syn::Error::new_spanned(nested.path, "expected `table = \"...\"`"));
        }
        if let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) = &nested.value
        {
            return Ok(Some(lit.value()));
        }
        return Err(syn::Error::new_spanned(nested.value, "table must be a string literal"));
    }
    Ok(None)
}
