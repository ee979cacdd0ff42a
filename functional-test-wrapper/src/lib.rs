// Stellar hardware wallet app test harness and supporting libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.


//! `#[functional_test]` turns an `async fn(Tester) -> Result<(), crate::Error>` into one
//! test per device model, named `<fn name>::<model>`.

use proc_macro::TokenStream;

use quote::quote;

use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Ident, ItemFn, LitStr, Token};

const MODELS: [(&str, &str); 3] = [("nanos", "NanoS"), ("nanosp", "NanoSP"), ("nanox", "NanoX")];

#[derive(Debug, Clone, Default)]
struct Attributes {
    case: Option<String>,
    models: Option<Vec<String>>,
}

struct SingleAttr {
    name: Ident,
    _equal: Token![=],
    value: LitStr,
}

impl Parse for SingleAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(SingleAttr {
            name: input.parse()?,
            _equal: input.parse()?,
            value: input.parse()?,
        })
    }
}

impl Parse for Attributes {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Attributes::default();
        let parsed = Punctuated::<SingleAttr, Token![,]>::parse_terminated(input)?;
        for attr in &parsed {
            match attr.name.to_string().as_str() {
                "case" => attrs.case = Some(attr.value.value()),
                "models" => {
                    let models = attr
                        .value
                        .value()
                        .split(',')
                        .map(|m| m.trim().to_lowercase())
                        .filter(|m| !m.is_empty())
                        .collect::<Vec<_>>();
                    let unknown = models
                        .iter()
                        .find(|m| !MODELS.iter().any(|(n, _)| *n == m.as_str()));
                    if let Some(m) = unknown {
                        return Err(syn::Error::new(
                            attr.value.span(),
                            format!("Unknown model `{}`", m),
                        ));
                    }
                    attrs.models = Some(models);
                }
                x => {
                    return Err(syn::Error::new(
                        attr.name.span(),
                        format!("Invalid attr {}", x),
                    ))
                }
            }
        }

        Ok(attrs)
    }
}

/// `test_sign_tx` -> `sign-tx`
fn case_name(ident: &str) -> String {
    ident
        .strip_prefix("test_")
        .unwrap_or(ident)
        .replace('_', "-")
}

#[proc_macro_attribute]
pub fn functional_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = parse_macro_input!(attr as Attributes);

    let mut input = parse_macro_input!(item as ItemFn);
    let original_ident = input.sig.ident.clone();
    let new_ident = Ident::new(&format!("{}_inner", original_ident), original_ident.span());
    let runner_ident = Ident::new(&format!("{}_run", original_ident), original_ident.span());
    input.sig.ident = new_ident.clone();

    let case = attrs
        .case
        .unwrap_or_else(|| case_name(&original_ident.to_string()));

    let models = MODELS
        .iter()
        .filter(|(name, _)| match &attrs.models {
            Some(models) => models.iter().any(|m| m.as_str() == *name),
            None => true,
        })
        .map(|(name, variant)| {
            let test_ident = Ident::new(name, original_ident.span());
            let variant = Ident::new(variant, original_ident.span());
            quote! {
                #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
                async fn #test_ident() -> Result<(), crate::Error> {
                    super::#runner_ident(::model::DeviceModel::#variant).await
                }
            }
        })
        .collect::<Vec<_>>();

    let expanded = quote! {
        #input

        async fn #runner_ident(model: ::model::DeviceModel) -> Result<(), crate::Error> {
            use crate::driver::{execute_case, Session};

            crate::tests::INIT_LOG.call_once(|| {
                env_logger::init();
            });

            let config = crate::tests::driver_config();
            let device = crate::tests::spawn_device(model, &config).await?;
            let store = crate::tests::snapshot_store(&config)?;

            let mut session = Session::new(model, #case, &device, device.link.clone(), store, config);
            let log = execute_case(&mut session, #new_ident).await?;

            if let Some(failure) = log.failure() {
                let to = crate::utils::report::report_path(&log)?;
                crate::utils::report::render_report(&to, &log)?;
                assert!(false, "Test '{}' on {} failed at {}. Report available here: {}", #case, model, failure, to.display());
            }

            Ok(())
        }

        mod #original_ident {
            #(#models)*
        }
    };

    TokenStream::from(expanded)
}
