//! Derive macro implementation for `Compact`.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments, Type};

/// What a field's innermost type encodes as.
enum Scalar<'a> {
    /// `bool`, `i8` ... `f64`; holds the method suffix, e.g. `int32`.
    Primitive(&'static str),
    String,
    /// Decimal and temporal values; holds the method suffix.
    Value(&'static str),
    GenericRecord,
    Nested(&'a Type),
}

/// The container shape around a scalar.
enum Shape<'a> {
    Plain(Scalar<'a>),
    Nullable(Scalar<'a>),
    /// `Vec<T>` or `Option<Vec<T>>`; the flag is set for the `Option`.
    Array { item: Scalar<'a>, nullable_items: bool, nullable: bool },
}

struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
}

pub fn derive_compact_impl(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let type_name = parse_type_name(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Compact can only be derived for structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Compact can only be derived for structs")),
    };

    let mut write_stmts = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            field_inits.push(quote! { #ident: ::core::default::Default::default() });
            continue;
        }
        let wire_name = attrs.rename.unwrap_or_else(|| ident.to_string());
        let shape = shape_of(&field.ty);

        write_stmts.push(write_stmt(ident, &shape, &wire_name));
        let read = read_expr(&shape, &wire_name, &type_name);
        field_inits.push(quote! { #ident: #read });
    }

    Ok(quote! {
        impl #impl_generics ::compact_core::Compact for #name #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #type_name
            }

            fn write(
                &self,
                writer: &mut dyn ::compact_core::CompactWriter,
            ) -> ::compact_core::Result<()> {
                #(#write_stmts)*
                Ok(())
            }

            fn read(
                reader: &mut dyn ::compact_core::CompactReader,
            ) -> ::compact_core::Result<Self> {
                Ok(Self {
                    #(#field_inits,)*
                })
            }
        }
    })
}

fn write_stmt(ident: &Ident, shape: &Shape<'_>, wire_name: &str) -> TokenStream {
    match shape {
        Shape::Plain(scalar) => match scalar {
            Scalar::Primitive(suffix) => {
                let method = format_ident!("write_{}", suffix);
                quote! { writer.#method(#wire_name, self.#ident)?; }
            }
            Scalar::String => quote! { writer.write_string(#wire_name, Some(self.#ident.as_str()))?; },
            Scalar::Value(suffix) => {
                let method = format_ident!("write_{}", suffix);
                quote! { writer.#method(#wire_name, Some(self.#ident))?; }
            }
            Scalar::GenericRecord => quote! { writer.write_generic_record(#wire_name, Some(&self.#ident))?; },
            Scalar::Nested(_) => quote! { writer.write_compact(#wire_name, Some(&self.#ident))?; },
        },
        Shape::Nullable(scalar) => match scalar {
            Scalar::Primitive(suffix) => {
                let method = format_ident!("write_nullable_{}", suffix);
                quote! { writer.#method(#wire_name, self.#ident)?; }
            }
            Scalar::String => quote! { writer.write_string(#wire_name, self.#ident.as_deref())?; },
            Scalar::Value(suffix) => {
                let method = format_ident!("write_{}", suffix);
                quote! { writer.#method(#wire_name, self.#ident)?; }
            }
            Scalar::GenericRecord => quote! { writer.write_generic_record(#wire_name, self.#ident.as_ref())?; },
            Scalar::Nested(_) => quote! { writer.write_compact(#wire_name, self.#ident.as_ref())?; },
        },
        Shape::Array { item, nullable_items, nullable } => {
            let slice = if *nullable {
                quote! { self.#ident.as_deref() }
            } else {
                quote! { Some(self.#ident.as_slice()) }
            };
            match (item, nullable_items) {
                (Scalar::Primitive(suffix), false) => {
                    let method = format_ident!("write_array_of_{}", suffix);
                    quote! { writer.#method(#wire_name, #slice)?; }
                }
                (Scalar::Primitive(suffix), true) => {
                    let method = format_ident!("write_array_of_nullable_{}", suffix);
                    quote! { writer.#method(#wire_name, #slice)?; }
                }
                (Scalar::Nested(_), true) => quote! { writer.write_array_of_compact(#wire_name, #slice)?; },
                (Scalar::Nested(_), false) => quote! {
                    {
                        let items = #slice.map(|items| {
                            items
                                .iter()
                                .map(|item| Some(item as &dyn ::compact_core::serialization::compact::CompactObject))
                                .collect::<Vec<_>>()
                        });
                        writer.write_array_of_compact_objects(#wire_name, items.as_deref())?;
                    }
                },
                (item, nullable_items) => {
                    let method = match item {
                        Scalar::String => format_ident!("write_array_of_string"),
                        Scalar::Value(suffix) => format_ident!("write_array_of_{}", suffix),
                        _ => format_ident!("write_array_of_generic_record"),
                    };
                    if *nullable_items {
                        quote! { writer.#method(#wire_name, #slice)?; }
                    } else {
                        quote! {
                            {
                                let items = #slice.map(|items| items.iter().cloned().map(Some).collect::<Vec<_>>());
                                writer.#method(#wire_name, items.as_deref())?;
                            }
                        }
                    }
                }
            }
        }
    }
}

fn read_expr(shape: &Shape<'_>, wire_name: &str, type_name: &str) -> TokenStream {
    let null_error = quote! {
        || ::compact_core::CompactError::Serialization(format!(
            "field '{}' of {} is null but its Rust type is not an Option",
            #wire_name, #type_name
        ))
    };
    match shape {
        Shape::Plain(Scalar::Primitive(suffix)) => {
            let method = format_ident!("read_{}", suffix);
            quote! { reader.#method(#wire_name)? }
        }
        Shape::Plain(scalar) => {
            let read = read_value(scalar, wire_name);
            quote! { #read.ok_or_else(#null_error)? }
        }
        Shape::Nullable(Scalar::Primitive(suffix)) => {
            let method = format_ident!("read_nullable_{}", suffix);
            quote! { reader.#method(#wire_name)? }
        }
        Shape::Nullable(scalar) => read_value(scalar, wire_name),
        Shape::Array { item, nullable_items, nullable } => {
            let read = match item {
                Scalar::Primitive(suffix) if *nullable_items => {
                    let method = format_ident!("read_array_of_nullable_{}", suffix);
                    quote! { reader.#method(#wire_name)? }
                }
                Scalar::Primitive(suffix) => {
                    let method = format_ident!("read_array_of_{}", suffix);
                    quote! { reader.#method(#wire_name)? }
                }
                _ => {
                    let read = read_array(item, wire_name);
                    if *nullable_items {
                        read
                    } else {
                        quote! {
                            #read
                                .map(|items| {
                                    items
                                        .into_iter()
                                        .map(|item| item.ok_or_else(#null_error))
                                        .collect::<::compact_core::Result<Vec<_>>>()
                                })
                                .transpose()?
                        }
                    }
                }
            };
            if *nullable {
                read
            } else {
                quote! { #read.ok_or_else(#null_error)? }
            }
        }
    }
}

fn read_value(scalar: &Scalar<'_>, wire_name: &str) -> TokenStream {
    match scalar {
        Scalar::String => quote! { reader.read_string(#wire_name)? },
        Scalar::Value(suffix) => {
            let method = format_ident!("read_{}", suffix);
            quote! { reader.#method(#wire_name)? }
        }
        Scalar::GenericRecord => quote! { reader.read_generic_record(#wire_name)? },
        Scalar::Nested(ty) => quote! { reader.read_compact::<#ty>(#wire_name)? },
        Scalar::Primitive(suffix) => {
            let method = format_ident!("read_nullable_{}", suffix);
            quote! { reader.#method(#wire_name)? }
        }
    }
}

fn read_array(item: &Scalar<'_>, wire_name: &str) -> TokenStream {
    match item {
        Scalar::String => quote! { reader.read_array_of_string(#wire_name)? },
        Scalar::Value(suffix) => {
            let method = format_ident!("read_array_of_{}", suffix);
            quote! { reader.#method(#wire_name)? }
        }
        Scalar::GenericRecord => quote! { reader.read_array_of_generic_record(#wire_name)? },
        Scalar::Nested(ty) => quote! { reader.read_array_of_compact::<#ty>(#wire_name)? },
        Scalar::Primitive(suffix) => {
            let method = format_ident!("read_array_of_nullable_{}", suffix);
            quote! { reader.#method(#wire_name)? }
        }
    }
}

fn shape_of(ty: &Type) -> Shape<'_> {
    if let Some(inner) = generic_arg(ty, "Option") {
        return match array_of(inner) {
            Some((item, nullable_items)) => Shape::Array {
                item,
                nullable_items,
                nullable: true,
            },
            None => Shape::Nullable(scalar_of(inner)),
        };
    }
    match array_of(ty) {
        Some((item, nullable_items)) => Shape::Array {
            item,
            nullable_items,
            nullable: false,
        },
        None => Shape::Plain(scalar_of(ty)),
    }
}

fn array_of(ty: &Type) -> Option<(Scalar<'_>, bool)> {
    let item = generic_arg(ty, "Vec")?;
    Some(match generic_arg(item, "Option") {
        Some(inner) => (scalar_of(inner), true),
        None => (scalar_of(item), false),
    })
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let segment = last_segment(ty)?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn scalar_of(ty: &Type) -> Scalar<'_> {
    let Some(segment) = last_segment(ty) else {
        return Scalar::Nested(ty);
    };
    match segment.ident.to_string().as_str() {
        "bool" => Scalar::Primitive("boolean"),
        "i8" => Scalar::Primitive("int8"),
        "i16" => Scalar::Primitive("int16"),
        "i32" => Scalar::Primitive("int32"),
        "i64" => Scalar::Primitive("int64"),
        "f32" => Scalar::Primitive("float32"),
        "f64" => Scalar::Primitive("float64"),
        "String" => Scalar::String,
        "Decimal" => Scalar::Value("decimal"),
        "NaiveTime" => Scalar::Value("time"),
        "NaiveDate" => Scalar::Value("date"),
        "NaiveDateTime" => Scalar::Value("timestamp"),
        "DateTime" => Scalar::Value("timestamp_with_timezone"),
        "GenericRecord" => Scalar::GenericRecord,
        _ => Scalar::Nested(ty),
    }
}

fn parse_type_name(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut type_name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("compact")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                let value: LitStr = meta.value()?.parse()?;
                type_name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported compact attribute; expected `type_name = \"...\"`"))
            }
        })?;
    }
    Ok(type_name)
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs {
        rename: None,
        skip: false,
    };
    for attr in attrs.iter().filter(|a| a.path().is_ident("compact")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                parsed.rename = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported compact field attribute; expected `rename = \"...\"` or `skip`"))
            }
        })?;
    }
    Ok(parsed)
}
