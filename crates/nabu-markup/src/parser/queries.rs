use crate::error::ParseError;
use crate::model::{KeyValue, Query, ScreenQuery};

use super::reader::{Element, TagReader};

/// Contents of a `<queries>` block.
#[derive(Debug, Default)]
pub(crate) struct QueryBlock {
    pub queries: Vec<Query>,
    pub screen_queries: Vec<ScreenQuery>,
}

/// Parse a `<queries>` block. Blank input yields an empty block.
pub(crate) fn parse_queries(src: &str) -> Result<QueryBlock, ParseError> {
    let mut reader = TagReader::new(src);
    let Some(root) = reader.expect_root("queries")? else {
        return Ok(QueryBlock::default());
    };

    let mut block = QueryBlock::default();
    reader.for_each_child(&root, |r, el| {
        match el.name.as_str() {
            "query" => block.queries.push(query(r, &el)?),
            "screenQuery" => block.screen_queries.push(screen_query(r, &el)?),
            _ => return Err(root.unexpected(&el)),
        }
        Ok(())
    })?;
    reader.finish()?;
    Ok(block)
}

fn query(r: &mut TagReader<'_>, el: &Element) -> Result<Query, ParseError> {
    let code = el.required("code")?.to_string();
    let method = el.attr("method").unwrap_or("GET").to_ascii_uppercase();
    let url = el.required("url")?.to_string();
    let body = el.attr("body").map(str::to_string);
    let parameters = params(r, el)?;
    Ok(Query { code, method, url, parameters, body })
}

fn screen_query(r: &mut TagReader<'_>, el: &Element) -> Result<ScreenQuery, ParseError> {
    let screen_code = el.required("screenCode")?.to_string();
    let query_code = el.required("queryCode")?.to_string();
    let order = el.int_or("order", 0)?;
    let output = el.attr("output").map(str::to_string);
    let parameters = params(r, el)?;
    Ok(ScreenQuery { screen_code, query_code, order, parameters, output })
}

/// `<param key=".." value=".."/>` children, in order.
pub(crate) fn params(r: &mut TagReader<'_>, el: &Element) -> Result<Vec<KeyValue>, ParseError> {
    let mut out = Vec::new();
    r.for_each_child(el, |r, child| {
        if child.name != "param" {
            return Err(el.unexpected(&child));
        }
        out.push(KeyValue {
            key: child.required("key")?.to_string(),
            value: child.attr("value").unwrap_or_default().to_string(),
        });
        r.leaf(&child)
    })?;
    Ok(out)
}
