//! End-to-end render of a realistic storefront page.

use serde_json::json;
use vellum::{CompiledTemplate, HelperRegistry, RenderData, Renderer};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>[data-v-seo.title]</title>
  <meta name="description" content="[data-v-seo.description]">
</head>
<body data-theme="[data-v-theme.mode]">
  <header>
    <a href="[data-v-base_url]">[data-v-site.name]</a>
    <!-- @if user -->
    <span>Welcome back, [data-v-user.firstName]</span>
    <!-- @else -->
    <a href="/login">Sign in</a>
    <!-- @endif -->
  </header>
  <nav>
    <!-- @loop name="categories" as="c" -->
    <a href="[data-v-c.url]">[data-v-c.name]</a>
    <!-- @endloop -->
  </nav>
  <!-- layout: main column -->
  <main>
    <!-- @if !products -->
    <p>No products found.</p>
    <!-- @endif -->
    <!-- @loop name="products" as="p" -->
    <article>
      <h2>[data-v-p.title]</h2>
      <p>[data-v-p.price] [data-v-currency]</p>
    </article>
    <!-- @endloop -->
  </main>
  <footer>
    <form method="post">
      <input type="hidden" name="_csrf" value="[data-v-csrf]">
    </form>
    &copy; [data-v-year] [data-v-site.name]
  </footer>
</body>
</html>
"#;

fn page_data() -> RenderData {
    serde_json::from_value(json!({
        "global": {
            "site": { "name": "Acme & Sons" },
            "user": { "firstName": "Ada" },
            "currency": "EUR"
        },
        "request": {
            "seo": {
                "title": "Shoes | Acme",
                "description": "Hand-made <quality> shoes"
            },
            "theme": { "mode": "dark" },
            "base_url": "https://acme.example",
            "csrf_token": "tok-789",
            "categories": [
                { "name": "Shoes", "url": "/c/shoes" },
                { "name": "Hats", "url": "/c/hats" }
            ],
            "products": [
                { "title": "Oxford", "price": 120 },
                { "title": "Brogue", "price": 140 }
            ]
        }
    }))
    .unwrap()
}

#[test]
fn renders_the_whole_page() {
    let template = CompiledTemplate::parse(PAGE).unwrap();
    let html = Renderer::new(&HelperRegistry::new()).render(&template, &page_data());

    // Escaped data values.
    assert!(html.contains("Acme &amp; Sons"));
    assert!(html.contains("Hand-made &lt;quality&gt; shoes"));

    // Scope chain: request-level SEO and theme, global-level user/currency.
    assert!(html.contains("<title>Shoes | Acme</title>"));
    assert!(html.contains(r#"<body data-theme="dark">"#));
    assert!(html.contains("Welcome back, Ada"));
    assert!(!html.contains("Sign in"));

    // Loops in document order.
    let shoes = html.find("/c/shoes").unwrap();
    let hats = html.find("/c/hats").unwrap();
    assert!(shoes < hats);
    assert!(html.contains("<h2>Oxford</h2>"));
    assert!(html.contains("120 EUR"));

    // Negated conditional over a non-empty collection renders nothing.
    assert!(!html.contains("No products found."));

    // Helpers.
    assert!(html.contains(r#"value="tok-789""#));
    assert!(html.contains(r#"href="https://acme.example""#));

    // Plain comments survive untouched.
    assert!(html.contains("<!-- layout: main column -->"));
}

#[test]
fn same_template_renders_against_many_contexts() {
    let template = CompiledTemplate::parse(PAGE).unwrap();
    let helpers = HelperRegistry::new();
    let renderer = Renderer::new(&helpers);

    let guest: RenderData = serde_json::from_value(json!({
        "request": { "products": [] }
    }))
    .unwrap();
    let html = renderer.render(&template, &guest);

    assert!(html.contains("Sign in"));
    assert!(html.contains("No products found."));
    // Missing SEO paths degrade to empty titles, not errors.
    assert!(html.contains("<title></title>"));
}

#[test]
fn recompiling_renders_identically() {
    let data = page_data();
    let helpers = HelperRegistry::new();
    let renderer = Renderer::new(&helpers);
    let first = renderer.render(&CompiledTemplate::parse(PAGE).unwrap(), &data);
    let second = renderer.render(&CompiledTemplate::parse(PAGE).unwrap(), &data);
    assert_eq!(first, second);
}
