use crate::dom::{Element, Node};
use crate::error::CanvasError;
use crate::resources::Fetcher;
use log::error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default base name for downloaded documents.
pub const DEFAULT_TITLE: &str = "illustration";

/// Produce a self-contained copy of the visual tree: explicit pixel
/// dimensions, every externally referenced vector document inlined as a
/// positioned group, and every identifier defined inside a fetched fragment
/// renamed to an index-prefixed unique name (with its internal references
/// rewritten to match). Fetches run sequentially in document order. A failed
/// fetch leaves that reference unflattened and the export continues.
pub fn flatten_document(tree: &Element, canvas: [f64; 2], fetcher: &dyn Fetcher) -> Element {
    let mut root = tree.clone();
    root.set_attr("width", canvas[0]);
    root.set_attr("height", canvas[1]);
    let mut index = 0usize;
    flatten_children(&mut root, fetcher, &mut index);
    root
}

/// Flattened document as a string, ready for download or print.
pub fn prepare_svg_content(tree: &Element, canvas: [f64; 2], fetcher: &dyn Fetcher) -> String {
    flatten_document(tree, canvas, fetcher).to_string()
}

fn flatten_children(element: &mut Element, fetcher: &dyn Fetcher, index: &mut usize) {
    let children = std::mem::take(&mut element.children);
    for node in children {
        match node {
            Node::Element(child) if child.name == "image" => {
                let position = *index;
                *index += 1;
                match flatten_image(&child, position, fetcher) {
                    Ok(group) => element.push(Node::Element(group)),
                    Err(e) => {
                        error!("could not flatten embedded reference: {e}");
                        element.push(Node::Element(child));
                    }
                }
            }
            Node::Element(mut child) => {
                flatten_children(&mut child, fetcher, index);
                element.push(Node::Element(child));
            }
            other => element.push(other),
        }
    }
}

fn flatten_image(
    image: &Element,
    index: usize,
    fetcher: &dyn Fetcher,
) -> Result<Element, CanvasError> {
    let href = image
        .attr("href")
        .or_else(|| image.attr("xlink:href"))
        .ok_or_else(|| CanvasError::Markup("image element without href".to_string()))?;
    let contents = fetcher.fetch(href)?;
    let mut fragment = Element::parse(&contents)?;

    if let Some(width) = image.attr("width") {
        fragment.set_attr("width", width);
    }
    if let Some(height) = image.attr("height") {
        fragment.set_attr("height", height);
    }

    let x = image.attr("x").unwrap_or("0");
    let y = image.attr("y").unwrap_or("0");
    let mut group = Element::new("g").set("transform", format!("translate({x},{y})"));

    let ids = collect_ids(&fragment);
    group.push(Node::Element(fragment));
    for old in &ids {
        let unique = format!("{index}-ns-{old}");
        rewrite_identifier(&mut group, old, &unique);
    }
    Ok(group)
}

fn collect_ids(element: &Element) -> Vec<String> {
    let mut ids = Vec::new();
    collect_ids_into(element, &mut ids);
    ids
}

fn collect_ids_into(element: &Element, out: &mut Vec<String>) {
    if let Some(id) = element.attr("id")
        && !id.is_empty()
    {
        out.push(id.to_string());
    }
    for child in element.child_elements() {
        collect_ids_into(child, out);
    }
}

/// Rename one identifier and every reference to it: `id` attributes,
/// fragment hrefs, and `url(#...)` occurrences inside attribute values.
fn rewrite_identifier(element: &mut Element, old: &str, new: &str) {
    let href_target = format!("#{old}");
    let url_target = format!("url(#{old})");
    let url_replacement = format!("url(#{new})");

    for slot in element.attrs_mut() {
        let (key, value) = (slot.0.as_str(), &mut slot.1);
        if key == "id" && *value == old {
            *value = new.to_string();
        } else if (key == "href" || key == "xlink:href") && *value == href_target {
            *value = format!("#{new}");
        } else if value.contains(&url_target) {
            *value = value.replace(&url_target, &url_replacement);
        }
    }
    for node in &mut element.children {
        if let Node::Element(child) = node {
            rewrite_identifier(child, old, new);
        }
    }
}

/// Write the flattened document under the given directory. Invoked only on
/// explicit user command.
pub fn download_svg(content: &str, dir: &Path, title: &str) -> Result<PathBuf, CanvasError> {
    let path = dir.join(format!("{title}.svg"));
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Hand the flattened document to the host print spooler. Invoked only on
/// explicit user command.
pub fn print_document(content: &str) -> Result<(), CanvasError> {
    let mut child = Command::new("lp")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|e| CanvasError::Print(e.to_string()))?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(content.as_bytes())
            .map_err(|e| CanvasError::Print(e.to_string()))?;
    }
    let status = child.wait().map_err(|e| CanvasError::Print(e.to_string()))?;
    if !status.success() {
        return Err(CanvasError::Print(format!(
            "print spooler exited with {status}"
        )));
    }
    Ok(())
}
