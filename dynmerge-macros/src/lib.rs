use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod node_meta;
use node_meta::{parse_node_info, parse_ports, PortField};

/// Registers a node type's metadata with the crate registry.
///
/// The struct must implement `Default` and `TaskCapableNode`.
#[proc_macro_derive(NodeComponent, attributes(node_meta, input, output))]
pub fn derive_node_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let node_info = match parse_node_info(&input) {
        Ok(info) => info,
        Err(e) => return e.write_errors().into(),
    };

    let (inputs, outputs) = match parse_ports(&input) {
        Ok(ports) => ports,
        Err(e) => return e.write_errors().into(),
    };

    let input_metas = match inputs.iter().map(port_metadata).collect::<syn::Result<Vec<_>>>() {
        Ok(metas) => metas,
        Err(e) => return e.to_compile_error().into(),
    };
    let output_metas = match outputs.iter().map(port_metadata).collect::<syn::Result<Vec<_>>>() {
        Ok(metas) => metas,
        Err(e) => return e.to_compile_error().into(),
    };

    let struct_name = &input.ident;
    let node_id = &node_info.id;
    let node_name = &node_info.name;
    let nickname = &node_info.nickname;
    let description = node_info.description.clone().unwrap_or_default();
    let category = &node_info.category;
    let subcategory = node_info.subcategory.clone().unwrap_or_default();

    let mod_name = syn::Ident::new(
        &format!("__node_registration_{}", struct_name.to_string().to_lowercase()),
        struct_name.span(),
    );

    let factory_fn_name = syn::Ident::new(
        &format!("create_metadata_{}", struct_name.to_string().to_lowercase()),
        struct_name.span(),
    );

    let expanded = quote! {
        mod #mod_name {
            use super::*;

            fn #factory_fn_name() -> crate::registry::NodeMetadata {
                crate::registry::NodeMetadata {
                    id: #node_id.to_string(),
                    name: #node_name.to_string(),
                    nickname: #nickname.to_string(),
                    description: #description.to_string(),
                    category: #category.to_string(),
                    subcategory: #subcategory.to_string(),
                    inputs: vec![#(#input_metas),*],
                    outputs: vec![#(#output_metas),*],
                    factory: || Box::new(#struct_name::default()),
                }
            }

            ::inventory::submit! {
                crate::registry::NodeMetadataFactoryWrapper(#factory_fn_name)
            }
        }
    };

    TokenStream::from(expanded)
}

fn port_metadata(port: &PortField) -> syn::Result<proc_macro2::TokenStream> {
    let ident = port
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "ports must be named fields"))?;

    let port_id = ident.to_string().trim_start_matches('_').to_string();
    let port_name = port.name.clone().unwrap_or_else(|| port_id.clone());
    let nickname = port.nickname.clone().unwrap_or_else(|| port_name.clone());
    let description = port.description.clone().unwrap_or_default();

    let access = match port.access.as_deref().unwrap_or("item") {
        "item" => quote!(crate::params::Access::Item),
        "list" => quote!(crate::params::Access::List),
        "tree" => quote!(crate::params::Access::Tree),
        other => {
            return Err(syn::Error::new(
                ident.span(),
                format!("unknown access '{}', expected item, list or tree", other),
            ))
        }
    };

    Ok(quote! {
        crate::registry::PortMetadata {
            id: #port_id.to_string(),
            name: #port_name.to_string(),
            nickname: #nickname.to_string(),
            description: #description.to_string(),
            access: #access,
        }
    })
}
