//! Synthetic pages

use adslot::slot::{create_ad_slot, wrap_slot_in_container, CreateSlotOptions, SlotKind};
use adslot_dom::{Document, NodeId, Viewport};

use anyhow::Result;

fn block(doc: &mut Document, parent: NodeId, tag: &str, classes: &[&str], height: f64) -> Result<NodeId> {
    let node = doc.create_block(tag, classes, height);
    doc.append_child(parent, node)?;
    Ok(node)
}

fn header(doc: &mut Document) -> Result<()> {
    let body = doc.body();
    let top = block(doc, body, "div", &["top-banner"], 0.0)?;
    let slot = create_ad_slot(doc, SlotKind::TopAboveNav, &CreateSlotOptions::default())?;
    let container = wrap_slot_in_container(doc, slot, &[])?;
    doc.append_child(top, container)?;
    block(doc, body, "header", &[], 120.0)?;
    Ok(())
}

fn footer(doc: &mut Document) -> Result<()> {
    let body = doc.body();
    let footer = block(doc, body, "div", &["content-footer"], 0.0)?;
    block(doc, footer, "section", &["onward"], 600.0)?;
    block(doc, footer, "section", &["most-viewed"], 400.0)?;
    Ok(())
}

/// An article with paragraphs, a couple of subheadings and a figure
pub fn article(viewport: Viewport, paragraphs: usize) -> Result<Document> {
    let mut doc = Document::new(viewport);
    header(&mut doc)?;

    let page_body = doc.body();
    let body = block(&mut doc, page_body, "div", &["article-body-commercial-selector"], 0.0)?;
    for n in 0..paragraphs {
        if n > 0 && n % 7 == 0 {
            block(&mut doc, body, "h2", &[], 60.0)?;
        }
        if n == 4 {
            block(&mut doc, body, "figure", &["element-image"], 420.0)?;
        }
        block(&mut doc, body, "p", &[], 140.0 + (n % 3) as f64 * 40.0)?;
    }

    footer(&mut doc)?;
    Ok(doc)
}

/// A liveblog with `blocks` posts
pub fn liveblog(viewport: Viewport, blocks: usize) -> Result<(Document, NodeId)> {
    let mut doc = Document::new(viewport);
    header(&mut doc)?;

    let page_body = doc.body();
    let body = block(&mut doc, page_body, "div", &["js-liveblog-body"], 0.0)?;
    for n in 0..blocks {
        block(&mut doc, body, "div", &["block"], 300.0 + (n % 4) as f64 * 100.0)?;
    }

    footer(&mut doc)?;
    Ok((doc, body))
}

/// New posts arrive at the top of the liveblog
pub fn prepend_blocks(doc: &mut Document, body: NodeId, count: usize) -> Result<()> {
    for _ in 0..count {
        let first = doc.tree().children(body).next();
        let post = doc.create_block("div", &["block"], 450.0);
        doc.insert_before(body, post, first)?;
    }
    Ok(())
}
