use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemFn};

/// Test attribute used across rxcore.
///
/// Sync tests expand to a plain `#[test]`. Async tests expand to
/// `#[tokio::test]` with the body running inside a `tokio::task::LocalSet`,
/// so the local tasks spawned by the async source adapters get driven.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let raw_args = proc_macro2::TokenStream::from(attr);
  if !raw_args.is_empty() {
    return TokenStream::from(
      syn::Error::new(raw_args.span(), "rxcore_macro::test does not take arguments")
        .to_compile_error(),
    );
  }

  let ItemFn { attrs, vis, sig, block } = input;

  let expanded = if sig.asyncness.is_some() {
    quote! {
      #(#attrs)*
      #[::tokio::test]
      #vis #sig {
        ::tokio::task::LocalSet::new().run_until(async move #block).await
      }
    }
  } else {
    quote! {
      #(#attrs)*
      #[test]
      #vis #sig #block
    }
  };

  TokenStream::from(expanded)
}
