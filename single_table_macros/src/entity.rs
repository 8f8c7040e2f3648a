use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr};

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let entity_type = match extract_name(&input) {
        Ok(entity_type) => entity_type,
        Err(err) => return err.to_compile_error().into(),
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics single_table::Entity for #name #ty_generics #where_clause {
            const ENTITY_TYPE: &'static str = #entity_type;
        }
    };

    TokenStream::from(expanded)
}

fn extract_name(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        let mut name = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("entity name must not be empty"));
                }
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute, expected `name`"))
            }
        })?;

        if let Some(name) = name {
            return Ok(name);
        }
    }

    // Default: the struct name
    Ok(input.ident.to_string())
}
