use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, LitStr, parse_macro_input};

#[derive(Default)]
struct MessageAttr {
    name: Option<LitStr>,
}

/// #[message] 宏实现
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut cfg = MessageAttr::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            cfg.name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported #[message] argument, expected `name = \"...\"`"))
        }
    });
    parse_macro_input!(attr with parser);

    let mut input = parse_macro_input!(item as Item);

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Clone),
        syn::parse_quote!(Debug),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];

    let (ident, generics) = match &mut input {
        Item::Struct(s) => {
            apply_derives(&mut s.attrs, required);
            (s.ident.clone(), s.generics.clone())
        }
        Item::Enum(e) => {
            apply_derives(&mut e.attrs, required);
            (e.ident.clone(), e.generics.clone())
        }
        other => {
            return syn::Error::new(other.span(), "#[message] only on struct or enum")
                .to_compile_error()
                .into();
        }
    };

    let name = cfg
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));

    if name.value().trim().is_empty() {
        return syn::Error::new(name.span(), "#[message] name must not be empty")
            .to_compile_error()
            .into();
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let out = quote! {
        #input

        impl #impl_generics ::defer_domain::message::Message for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
        }
    };

    TokenStream::from(out)
}
