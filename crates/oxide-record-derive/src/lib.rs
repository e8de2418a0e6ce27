//! Derive macro for active-record schema descriptors.
//!
//! This crate provides `#[derive(Record)]`, which implements
//! `oxide_record::Record` for a struct with named fields.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, Lit,
    Meta, PathArguments, Type,
};

/// Derives `oxide_record::Record` for a struct.
///
/// # Attributes
///
/// - `#[record(table = "table_name")]` - The SQL table name (required)
///
/// # Field Attributes
///
/// - `#[record(column = "column_name")]` - The SQL column name (optional,
///   defaults to the field name)
/// - `#[record(skip)]` - Excludes the field from persistence
///
/// # Fields
///
/// - Exactly one field of type `RecordState` holds the identity and the
///   dirty set.
/// - Fields of type `Related<T>` are relation attributes, stored as the id
///   of the related record.
/// - Every other field is a value attribute and must implement
///   `ToSqlValue` and `FromSqlValue`.
///
/// The identity lives in `RecordState`, so a persisted field named `id` is
/// rejected.
///
/// # Generated Items
///
/// For a struct `Order`, this macro generates:
///
/// - `impl Record for Order` with a static schema descriptor listing the
///   persistent attributes in declaration order
/// - `Order::set_<field>` setters that assign the field and mark it
///   modified; relation setters take the related record
/// - `Order::clear_<relation>` to unset a relation, also marked modified
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record derive does not support generic structs",
        ));
    }

    let table_name = get_table_name(&input.attrs)?.ok_or_else(|| {
        syn::Error::new_spanned(
            struct_name,
            "Record derive requires #[record(table = \"...\")]",
        )
    })?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ));
        }
    };

    let mut state_field: Option<Ident> = None;
    let mut attribute_infos: Vec<AttributeInfo> = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            continue;
        };
        let field_attrs = parse_field_attrs(&field.attrs)?;
        if field_attrs.skip {
            continue;
        }

        if is_record_state(&field.ty) {
            if state_field.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "Record derive found more than one RecordState field",
                ));
            }
            state_field = Some(field_name);
            continue;
        }

        if field_name == "id" {
            return Err(syn::Error::new_spanned(
                &field_name,
                "`id` is the record identity and is kept in RecordState; \
                 rename the field or mark it #[record(skip)]",
            ));
        }

        let column_name = field_attrs
            .column
            .unwrap_or_else(|| field_name.to_string());
        if column_name == "id" {
            return Err(syn::Error::new_spanned(
                &field_name,
                "column `id` is reserved for the record identity",
            ));
        }
        if let Some(previous) = attribute_infos.iter().find(|a| a.column_name == column_name) {
            return Err(syn::Error::new_spanned(
                &field_name,
                format!(
                    "column `{column_name}` is already used by `{}`",
                    previous.field_name
                ),
            ));
        }

        attribute_infos.push(AttributeInfo {
            related_type: related_type(&field.ty).cloned(),
            field_name,
            field_type: field.ty.clone(),
            column_name,
        });
    }

    let state_field = state_field.ok_or_else(|| {
        syn::Error::new_spanned(
            struct_name,
            "Record derive requires a field of type RecordState",
        )
    })?;

    // Accessor functions referenced by the static descriptor
    let accessor_fns: Vec<TokenStream2> = attribute_infos
        .iter()
        .map(|info| {
            let field_name = &info.field_name;
            if info.related_type.is_some() {
                let slot_fn = format_ident!("__slot_{}", field_name);
                let slot_mut_fn = format_ident!("__slot_mut_{}", field_name);
                quote! {
                    fn #slot_fn(record: &#struct_name) -> &dyn ::oxide_record::RelationSlot {
                        &record.#field_name
                    }

                    fn #slot_mut_fn(
                        record: &mut #struct_name,
                    ) -> &mut dyn ::oxide_record::RelationSlot {
                        &mut record.#field_name
                    }
                }
            } else {
                let read_fn = format_ident!("__read_{}", field_name);
                let write_fn = format_ident!("__write_{}", field_name);
                quote! {
                    fn #read_fn(record: &#struct_name) -> ::oxide_record::SqlValue {
                        ::oxide_record::ToSqlValue::to_sql_value(&record.#field_name)
                    }

                    fn #write_fn(
                        record: &mut #struct_name,
                        value: ::oxide_record::SqlValue,
                    ) -> ::core::result::Result<(), ::oxide_record::ValueError> {
                        record.#field_name = ::oxide_record::FromSqlValue::from_sql_value(value)?;
                        ::core::result::Result::Ok(())
                    }
                }
            }
        })
        .collect();

    // Descriptor entries, in declaration order
    let schema_entries: Vec<TokenStream2> = attribute_infos
        .iter()
        .map(|info| {
            let field_name = &info.field_name;
            let attribute_name = field_name.to_string();
            let column_name = &info.column_name;
            if info.related_type.is_some() {
                let slot_fn = format_ident!("__slot_{}", field_name);
                let slot_mut_fn = format_ident!("__slot_mut_{}", field_name);
                quote! {
                    ::oxide_record::Attribute::relation(
                        #attribute_name,
                        #column_name,
                        #slot_fn,
                        #slot_mut_fn,
                    )
                }
            } else {
                let read_fn = format_ident!("__read_{}", field_name);
                let write_fn = format_ident!("__write_{}", field_name);
                quote! {
                    ::oxide_record::Attribute::value(
                        #attribute_name,
                        #column_name,
                        #read_fn,
                        #write_fn,
                    )
                }
            }
        })
        .collect();

    // Tracked setters
    let setters: Vec<TokenStream2> = attribute_infos
        .iter()
        .map(|info| {
            let field_name = &info.field_name;
            let attribute_name = field_name.to_string();
            let setter = format_ident!("set_{}", field_name);
            match &info.related_type {
                Some(related) => {
                    let clearer = format_ident!("clear_{}", field_name);
                    let doc = format!(
                        "Sets the related `{attribute_name}` record and marks it modified."
                    );
                    let clear_doc =
                        format!("Removes the related `{attribute_name}` record and marks it modified.");
                    quote! {
                        #[doc = #doc]
                        pub fn #setter(&mut self, value: #related) {
                            self.#field_name = ::oxide_record::Related::new(value);
                            self.#state_field.mark_modified(#attribute_name);
                        }

                        #[doc = #clear_doc]
                        pub fn #clearer(&mut self) {
                            self.#field_name = ::oxide_record::Related::Unset;
                            self.#state_field.mark_modified(#attribute_name);
                        }
                    }
                }
                None => {
                    let field_type = &info.field_type;
                    let doc = format!("Sets `{attribute_name}` and marks it modified.");
                    quote! {
                        #[doc = #doc]
                        pub fn #setter(&mut self, value: #field_type) {
                            self.#field_name = value;
                            self.#state_field.mark_modified(#attribute_name);
                        }
                    }
                }
            }
        })
        .collect();

    let expanded = quote! {
        impl ::oxide_record::Record for #struct_name {
            const TABLE: &'static str = #table_name;

            fn schema() -> &'static ::oxide_record::Schema<Self> {
                #(#accessor_fns)*

                static SCHEMA: ::oxide_record::Schema<#struct_name> =
                    ::oxide_record::Schema::new(#table_name, &[#(#schema_entries),*]);
                &SCHEMA
            }

            fn state(&self) -> &::oxide_record::RecordState {
                &self.#state_field
            }

            fn state_mut(&mut self) -> &mut ::oxide_record::RecordState {
                &mut self.#state_field
            }
        }

        impl #struct_name {
            #(#setters)*
        }
    };

    Ok(expanded)
}

struct AttributeInfo {
    field_name: Ident,
    field_type: Type,
    column_name: String,
    related_type: Option<Type>,
}

struct FieldAttrs {
    column: Option<String>,
    skip: bool,
}

fn get_table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut table_name = None;
    for attr in attrs {
        if attr.path().is_ident("record") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let name = parse_str_value(&meta)?;
                    if name.is_empty() {
                        return Err(meta.error("table name must not be empty"));
                    }
                    table_name = Some(name);
                    Ok(())
                } else {
                    Err(meta.error("unsupported record attribute, expected `table`"))
                }
            })?;
        }
    }
    Ok(table_name)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs {
        column: None,
        skip: false,
    };

    for attr in attrs {
        if attr.path().is_ident("record") {
            // Handle empty attribute like #[record]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.path.is_ident("column") {
                    result.column = Some(parse_str_value(&meta)?);
                } else {
                    return Err(meta.error(
                        "unsupported record field attribute, expected `column` or `skip`",
                    ));
                }
                Ok(())
            })?;
        }
    }

    Ok(result)
}

fn parse_str_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: Expr = meta.value()?.parse()?;
    if let Expr::Lit(lit) = &value {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(value, "expected a string literal"))
}

/// The last path segment of `ty`, if it is a plain path type.
fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path.path.segments.last(),
        _ => None,
    }
}

fn is_record_state(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == "RecordState")
}

/// `T` for a field of type `Related<T>`.
fn related_type(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident != "Related" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}
