use proc_macro2 as pm2;

use crate::attributes;

pub fn derive_model(input: syn::DeriveInput) -> pm2::TokenStream {
    let syn::DeriveInput {
        ident,
        data,
        generics,
        attrs,
        ..
    } = input;

    if !generics.params.is_empty() {
        return syn::Error::new(
            ident.span(),
            "Model can only be derived for structs without generic parameters.",
        )
        .to_compile_error();
    }

    let struct_meta = match attributes::collect(&attrs) {
        Ok(meta) => meta,
        Err(e) => return syn::Error::into_compile_error(e),
    };
    let label = struct_meta
        .label
        .unwrap_or_else(|| syn::LitStr::new(&ident.to_string(), ident.span()));

    let named = match data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(syn::FieldsNamed { named, .. }),
            ..
        }) => named,
        _ => {
            return syn::Error::new(
                ident.span(),
                "Model can only be derived for structs with named fields.",
            )
            .to_compile_error();
        }
    };

    let mut arms = pm2::TokenStream::new();
    let mut pk = syn::LitStr::new("id", ident.span());

    for field in named.iter() {
        let fieldid = match field.ident.as_ref() {
            Some(fieldid) => fieldid,
            None => continue,
        };
        let fieldtype = &field.ty;

        let meta = match attributes::collect(&field.attrs) {
            Ok(meta) => meta,
            Err(e) => return syn::Error::into_compile_error(e),
        };
        if meta.excluded {
            continue;
        }

        let fieldname = meta
            .name
            .unwrap_or_else(|| syn::LitStr::new(&fieldid.to_string(), fieldid.span()));
        if meta.primary_key {
            pk = fieldname.clone();
        }

        if meta.relation {
            let attname = syn::LitStr::new(&format!("{}_id", fieldname.value()), fieldname.span());
            arms.extend(quote::quote! {
                #fieldname | #attname => Some(::queryset_cmd::schema::Field::relation(
                    #fieldname,
                    #attname,
                    Box::new(<#fieldtype as ::queryset_cmd::schema::Model>::get_meta()),
                )),
            });
        } else if meta.untyped {
            arms.extend(quote::quote! {
                #fieldname => Some(::queryset_cmd::schema::Field::new(#fieldname, None)),
            });
        } else {
            arms.extend(quote::quote! {
                #fieldname => Some(::queryset_cmd::schema::Field::new(
                    #fieldname,
                    <#fieldtype as ::queryset_cmd::schema::Typed>::FIELD_TYPE,
                )),
            });
        }
    }

    let meta_ident = quote::format_ident!("__QuerysetMeta{}", ident);

    quote::quote! {
        #[doc(hidden)]
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #meta_ident;

        const _: () = {
            #[automatically_derived]
            impl ::queryset_cmd::schema::Schema for #meta_ident {
                fn label(&self) -> &str {
                    #label
                }

                fn get_field(&self, name: &str) -> Option<::queryset_cmd::schema::Field<'_>> {
                    match name {
                        #arms
                        _ => None,
                    }
                }

                fn pk_name(&self) -> &str {
                    #pk
                }
            }

            #[automatically_derived]
            impl ::queryset_cmd::schema::Model for #ident {
                type Meta = #meta_ident;
                fn get_meta() -> Self::Meta {
                    #meta_ident
                }
            }
        };
    }
}
