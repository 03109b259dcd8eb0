use proc_macro::{self, TokenStream};

use proc_macro2 as pm2;

mod attributes;
mod model;

/// Derive the `Model` trait, describing a struct as a `Schema` that
/// filter clauses can be resolved against.
///
/// This is only implemented for structs with named fields and no
/// generic parameters. All fields are exposed, typed through the
/// `Typed` trait, unless annotated to indicate otherwise. The
/// annotations use the `queryset` attribute, which has the following
/// options:
///
/// - `#[queryset(label = "app.Model")]` On the struct: the label of
///   the model, used in error messages. The struct name by default.
///
/// - `#[queryset(rename = "new_name")]` Expose the annotated member
///   as `new_name` instead of using its name in the source code.
///
/// - `#[queryset(exclude)]` Do not expose this field. Clauses which
///   refer to it are treated as naming an unknown field.
///
/// - `#[queryset(relation)]` The type of this field is itself a
///   `Model`, and nested clauses onto its members are permitted via
///   the double underscore syntax that Django uses. The field also
///   answers to `<name>_id`, and takes the type of the related
///   primary key.
///
/// - `#[queryset(untyped)]` The field has no declared type, so values
///   are coerced to the type of a caller supplied reference value, or
///   left as strings.
///
/// - `#[queryset(primary_key)]` This field is the primary key, in
///   place of `id`.
#[proc_macro_derive(Model, attributes(queryset))]
pub fn model(input: TokenStream) -> TokenStream {
    let derive: syn::DeriveInput = syn::parse_macro_input!(input);

    let res: pm2::TokenStream = model::derive_model(derive);

    res.into()
}
