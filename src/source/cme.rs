/*!
Scrape futures identifiers from CME product pages.

Discovery walks four levels: the asset class landing page links to product-group subpages, which list commodity
pages, which carry a Globex code and a link to the contract specs, whose spec table names the clearing code.
*/
use super::PageFetcher;
use crate::instrument::{AssetClass, CME_ROOT};
use crate::{Error, Result};
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| Error::parse(format!("bad selector {:?}: {}", css, err)))
}

fn text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Make a scraped link absolute against the CME site root
pub fn absolutize(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", CME_ROOT, href)
    } else {
        format!("{}/{}", CME_ROOT, href)
    }
}

/// Product-group subpages linked from a landing page: `a.chevron-right` links under one of `prefixes`
pub fn parse_subpages<S: AsRef<str>>(html: &str, prefixes: &[S]) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let anchors = selector("a.chevron-right")?;
    Ok(document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| prefixes.iter().any(|prefix| href.starts_with(prefix.as_ref())))
        .map(absolutize)
        .unique()
        .collect())
}

/// Commodity pages listed on a subpage: the first link in each `cmeTableLeft` cell.
///
/// A subpage without any such cells is itself a commodity page.
pub fn parse_commodity_pages(html: &str, page_url: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let cell_selector = selector("td.cmeTableLeft, th.cmeTableLeft")?;
    let anchors = selector("a")?;
    let cells: Vec<ElementRef> = document.select(&cell_selector).collect();
    if cells.is_empty() {
        return Ok(vec![page_url.to_string()]);
    }
    Ok(cells
        .into_iter()
        .filter_map(|cell| cell.select(&anchors).next())
        .filter_map(|a| a.value().attr("href"))
        .map(absolutize)
        .unique()
        .collect())
}

/// What a commodity page says about its product
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPage {
    /// The Globex ticker, from `span.globex`
    pub globex: Option<String>,
    /// The contract specs link, from the `contractSpecs` menu item
    pub specs: Option<String>,
}

/// Read the Globex code and contract specs link off a commodity page
pub fn parse_product_page(html: &str) -> Result<ProductPage> {
    let document = Html::parse_document(html);
    let globex = selector("span.globex")?;
    let specs = selector(r#"div.menu-item[data-key="contractSpecs"] a"#)?;
    Ok(ProductPage {
        globex: document
            .select(&globex)
            .next()
            .map(text)
            .filter(|code| !code.is_empty()),
        specs: document
            .select(&specs)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(absolutize),
    })
}

/// Clearing codes on a contract specs page: the second span of the third `item-container` that has spans
pub fn parse_clearing_names(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let containers = selector("div.item-container")?;
    let span_selector = selector("span")?;
    Ok(document
        .select(&containers)
        .map(|div| div.select(&span_selector).collect::<Vec<_>>())
        .filter(|spans| !spans.is_empty())
        .nth(2)
        .and_then(|spans| spans.get(1).copied())
        .map(text)
        .filter(|name| !name.is_empty())
        .into_iter()
        .collect())
}

/// Identifiers discovered for one asset class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedNames {
    /// Globex tickers, sorted and deduplicated
    pub globex: Vec<String>,
    /// Clearing codes, sorted and deduplicated
    pub clearing: Vec<String>,
}

async fn fetch_each<F: PageFetcher + ?Sized>(fetcher: &F, urls: &[String]) -> Vec<(String, String)> {
    let mut pages = Vec::with_capacity(urls.len());
    for url in urls {
        match fetcher.fetch(url).await {
            Ok(html) => pages.push((url.clone(), html)),
            Err(err) => tracing::warn!(url = %url, error = %err, "failed to fetch CME page"),
        }
    }
    pages
}

/// Walk the CME pages for `class` and collect its Globex and clearing codes.
///
/// Only the landing page is required; pages further down that fail to fetch or parse are logged and skipped.
pub async fn scrape_names<F: PageFetcher + ?Sized>(fetcher: &F, class: AssetClass) -> Result<ScrapedNames> {
    let landing = class
        .cme_landing_page()
        .ok_or_else(|| Error::Config(format!("{} has no CME listing", class)))?;
    let landing_html = fetcher.fetch(&landing).await?;
    let subpages = parse_subpages(&landing_html, &class.cme_subpage_prefixes())?;
    tracing::info!(%class, subpages = subpages.len(), "found commodity subpages");

    let mut commodity_pages = Vec::new();
    for (url, html) in fetch_each(fetcher, &subpages).await {
        match parse_commodity_pages(&html, &url) {
            Ok(pages) => commodity_pages.extend(pages),
            Err(err) => tracing::warn!(url = %url, error = %err, "unreadable subpage"),
        }
    }
    let commodity_pages: Vec<String> = commodity_pages.into_iter().unique().collect();
    tracing::info!(%class, pages = commodity_pages.len(), "found commodity pages");

    let mut globex = Vec::new();
    let mut spec_pages = Vec::new();
    for (url, html) in fetch_each(fetcher, &commodity_pages).await {
        match parse_product_page(&html) {
            Ok(product) => {
                globex.extend(product.globex);
                spec_pages.extend(product.specs);
            }
            Err(err) => tracing::warn!(url = %url, error = %err, "unreadable commodity page"),
        }
    }
    let spec_pages: Vec<String> = spec_pages.into_iter().unique().collect();
    tracing::info!(%class, globex = globex.len(), specs = spec_pages.len(), "found globex tickers and specs");

    let mut clearing = Vec::new();
    for (url, html) in fetch_each(fetcher, &spec_pages).await {
        match parse_clearing_names(&html) {
            Ok(names) => clearing.extend(names),
            Err(err) => tracing::warn!(url = %url, error = %err, "unreadable specs page"),
        }
    }

    let names = ScrapedNames {
        globex: globex.into_iter().sorted().dedup().collect(),
        clearing: clearing.into_iter().sorted().dedup().collect(),
    };
    tracing::info!(%class, clearing = names.clearing.len(), "found clearing codes");
    Ok(names)
}
