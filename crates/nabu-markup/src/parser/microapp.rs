use crate::error::ParseError;
use crate::model::Microapp;

use super::reader::TagReader;

/// Parse the `<microapp>` root. Blank input yields `None`.
pub(crate) fn parse_microapp(src: &str) -> Result<Option<Microapp>, ParseError> {
    let mut reader = TagReader::new(src);
    let Some(el) = reader.expect_root("microapp")? else {
        return Ok(None);
    };
    let microapp = Microapp {
        title: el.required("title")?.to_string(),
        code: el.required("code")?.to_string(),
        deeplink: el.attr("deeplink").map(str::to_string),
    };
    reader.leaf(&el)?;
    reader.finish()?;
    Ok(Some(microapp))
}
