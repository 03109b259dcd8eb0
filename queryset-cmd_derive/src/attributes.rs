#[derive(Debug)]
pub enum QuerysetItem {
    Rename(syn::LitStr),
    Label(syn::LitStr),
    Ignored,
    Relation,
    Untyped,
    PrimaryKey,
}

impl syn::parse::Parse for QuerysetItem {
    fn parse(input: syn::parse::ParseStream<'_>) -> syn::Result<Self> {
        let attr: syn::Ident = input.parse()?;
        match attr.to_string().as_str() {
            "rename" => {
                // rename = "MyString"
                let _: syn::Token![=] = input.parse()?;
                let new_name: syn::LitStr = input.parse()?;
                Ok(QuerysetItem::Rename(new_name))
            }
            "label" => {
                // label = "app.Model"
                let _: syn::Token![=] = input.parse()?;
                let label: syn::LitStr = input.parse()?;
                Ok(QuerysetItem::Label(label))
            }
            "exclude" => Ok(QuerysetItem::Ignored),
            "relation" => Ok(QuerysetItem::Relation),
            "untyped" => Ok(QuerysetItem::Untyped),
            "primary_key" => Ok(QuerysetItem::PrimaryKey),
            _ => Err(syn::Error::new_spanned(
                attr,
                "unsupported queryset attribute",
            )),
        }
    }
}

#[derive(Debug, Default)]
pub struct QuerysetMeta {
    pub name: Option<syn::LitStr>,
    pub label: Option<syn::LitStr>,
    pub excluded: bool,
    pub relation: bool,
    pub untyped: bool,
    pub primary_key: bool,
}

impl syn::parse::Parse for QuerysetMeta {
    fn parse(input: syn::parse::ParseStream<'_>) -> syn::Result<Self> {
        let mut meta = QuerysetMeta::default();
        let punc =
            syn::punctuated::Punctuated::<QuerysetItem, syn::Token![,]>::parse_terminated(input)?;

        for item in punc {
            match item {
                QuerysetItem::Rename(new_name) => meta.name = Some(new_name),
                QuerysetItem::Label(label) => meta.label = Some(label),
                QuerysetItem::Ignored => meta.excluded = true,
                QuerysetItem::Relation => meta.relation = true,
                QuerysetItem::Untyped => meta.untyped = true,
                QuerysetItem::PrimaryKey => meta.primary_key = true,
            }
        }

        Ok(meta)
    }
}

/// Merge every `#[queryset(...)]` attribute in `attrs`.
pub fn collect(attrs: &[syn::Attribute]) -> syn::Result<QuerysetMeta> {
    let mut meta = QuerysetMeta::default();
    for attr in attrs.iter() {
        if attr.path.is_ident("queryset") {
            let parsed = attr.parse_args::<QuerysetMeta>()?;
            meta.name = parsed.name.or(meta.name);
            meta.label = parsed.label.or(meta.label);
            meta.excluded |= parsed.excluded;
            meta.relation |= parsed.relation;
            meta.untyped |= parsed.untyped;
            meta.primary_key |= parsed.primary_key;
        }
    }
    Ok(meta)
}
