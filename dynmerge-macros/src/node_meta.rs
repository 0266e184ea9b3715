use darling::{FromAttributes, FromField};
use syn::{DeriveInput, Fields};

/// Parsed attributes from #[node_meta(...)]
#[derive(Debug, FromAttributes)]
#[darling(attributes(node_meta))]
pub struct NodeMetaArgs {
    pub id: String,
    pub name: String,
    pub nickname: String,
    #[darling(default)]
    pub description: Option<String>,
    pub category: String,
    #[darling(default)]
    pub subcategory: Option<String>,
}

/// Parse inputs/outputs from #[input(...)] / #[output(...)]
#[derive(Debug, FromField)]
#[darling(attributes(input, output))]
pub struct PortField {
    pub ident: Option<syn::Ident>,

    #[darling(default)]
    pub name: Option<String>,

    #[darling(default)]
    pub nickname: Option<String>,

    #[darling(default)]
    pub description: Option<String>,

    /// "item", "list" or "tree"
    #[darling(default)]
    pub access: Option<String>,
}

pub fn parse_node_info(input: &DeriveInput) -> darling::Result<NodeMetaArgs> {
    NodeMetaArgs::from_attributes(&input.attrs)
}

pub fn parse_ports(input: &DeriveInput) -> darling::Result<(Vec<PortField>, Vec<PortField>)> {
    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Ok((Vec::new(), Vec::new())),
        },
        _ => return Ok((Vec::new(), Vec::new())),
    };

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();

    for field in fields.iter() {
        if field.attrs.iter().any(|attr| attr.path().is_ident("input")) {
            inputs.push(PortField::from_field(field)?);
        }

        if field.attrs.iter().any(|attr| attr.path().is_ident("output")) {
            outputs.push(PortField::from_field(field)?);
        }
    }

    Ok((inputs, outputs))
}
