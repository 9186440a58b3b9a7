use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use quote::quote_spanned;

/// Turns a function into a test running against a freshly started mock server.
///
/// `#[contract_test("Consumer", "Provider")]` or
/// `#[contract_test("Consumer", "Provider", configure_fn)]`, where `configure_fn` takes a
/// `&mut accord::MockServerConfig`. The function either takes no arguments or a single
/// `&mut accord::MockServer`.
#[proc_macro_attribute]
pub fn contract_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    let attributes = &input.attrs;
    let visibility = &input.vis;
    let name = &input.sig.ident;
    let inputs = &input.sig.inputs;
    let block = &input.block;

    if args.len() < 2 || args.len() > 3 {
        return quote! {
            compile_error!("A consumer name, a provider name and optionally a configuration function should be passed to the macro");
        }
        .into();
    }

    let consumer = match parse_name(&args[0], "consumer") {
        Ok(consumer) => consumer,
        Err(stream) => return stream.into(),
    };
    let provider = match parse_name(&args[1], "provider") {
        Ok(provider) => provider,
        Err(stream) => return stream.into(),
    };

    let configure = match args.get(2) {
        Some(syn::NestedMeta::Meta(syn::Meta::Path(function_path))) => {
            quote! { #function_path(&mut __accord_configuration); }
        }
        Some(_) => {
            return quote! {
                compile_error!("The third argument should be a configuration function!");
            }
            .into();
        }
        None => quote! {},
    };

    let call = match inputs.len() {
        0 => quote! { __contract_body() },
        1 => quote! { __contract_body(&mut __accord_server) },
        _ => {
            return quote_spanned! {input.sig.ident.span()=>
                compile_error!("A contract test takes no arguments or a single &mut accord::MockServer");
            }
            .into();
        }
    };

    let output = quote! {
        #[test]
        #(#attributes)*
        #visibility fn #name() {
            fn __contract_body(#inputs) #block

            let mut __accord_configuration = accord::MockServerConfig::new(#consumer, #provider);
            #configure
            let mut __accord_server = match accord::MockServer::start(__accord_configuration) {
                Ok(server) => server,
                Err(e) => panic!("Accord Error: {}", e),
            };

            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                #call
            })) {
                drop(__accord_server);
                std::panic::resume_unwind(e);
            }
            if let Err(e) = __accord_server.verify_and_finalize() {
                panic!("Accord Error: {}", e);
            }
        }
    };

    TokenStream::from(output)
}

fn parse_name(arg: &syn::NestedMeta, role: &str) -> Result<String, proc_macro2::TokenStream> {
    if let syn::NestedMeta::Lit(syn::Lit::Str(name)) = arg {
        validate_name(&name.value(), role, name.span())?;
        Ok(name.value())
    } else {
        let message = format!("The {} name should be a string literal!", role);
        Err(quote! {
            compile_error!(#message);
        })
    }
}

fn validate_name(name: &str, role: &str, span: Span) -> Result<(), proc_macro2::TokenStream> {
    if name.trim().is_empty() {
        let message = format!("The {} name can't be empty!", role);
        return Err(quote_spanned! {span=>
            compile_error!(#message);
        });
    }

    Ok(())
}
