use super::model::{Article, Bundle, Section};
use super::{COVER_PATH, TOC_HTML_PATH, TOC_NCX_PATH};
use crate::xml::xml_escape;

/// Heading of the TOC page and label of the periodical nav node.
const TOC_LABEL: &str = "目录";
const SUBJECT: &str = "杂志";

/// Standalone page of one article. Depends only on its inputs, so re-harvesting
/// the same chapter regenerates the same bytes.
pub fn render_article_page(title: &str, body_html: &str) -> String {
    let title = xml_escape(title);
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str(
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" lang=\"en\" xml:lang=\"en\">\n",
    );
    out.push_str("<head>\n");
    out.push_str(
        "  <meta http-equiv=\"Content-Type\" content=\"application/xhtml+xml; charset=utf-8\" />\n",
    );
    out.push_str(&format!("  <title>{title}</title>\n"));
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str("  <div id=\"section1\"></div>\n");
    out.push_str(&format!(
        "  <h1 id=\"title1\"><font size=\"7\"><b>{title}</b></font></h1>\n"
    ));
    out.push_str("  <br />\n");
    out.push_str("  ");
    out.push_str(body_html);
    out.push('\n');
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

/// Page path relative to the bundle root.
pub fn article_href(article: &Article) -> String {
    format!("html/{}", page_href(article))
}

/// Page file name as a URL reference. Ids come from section titles, so
/// characters such as `#` or spaces must be percent-encoded.
fn page_href(article: &Article) -> String {
    format!("{}.html", urlencoding::encode(&article.id))
}

pub fn render_content_opf(bundle: &Bundle) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str(
        "<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"2.0\" unique-identifier=\"uid\">\n",
    );
    out.push_str("  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n");
    out.push_str("    <dc-metadata>\n");
    out.push_str(&format!(
        "      <dc:title>{} {}</dc:title>\n",
        xml_escape(&bundle.title),
        xml_escape(&bundle.date)
    ));
    out.push_str(&format!(
        "      <dc:language>{}</dc:language>\n",
        xml_escape(&bundle.language)
    ));
    out.push_str(&format!("      <dc:subject>{SUBJECT}</dc:subject>\n"));
    out.push_str(&format!(
        "      <dc:identifier id=\"uid\">urn:uuid:{}</dc:identifier>\n",
        xml_escape(&bundle.id)
    ));
    out.push_str(&format!(
        "      <dc:date>{}</dc:date>\n",
        xml_escape(&bundle.date)
    ));
    out.push_str("    </dc-metadata>\n");
    out.push_str("    <x-metadata>\n");
    out.push_str(
        "      <output content-type=\"application/x-mobipocket-subscription-magazine\" encoding=\"utf-8\" />\n",
    );
    out.push_str(&format!("      <EmbeddedCover>{COVER_PATH}</EmbeddedCover>\n"));
    out.push_str("    </x-metadata>\n");
    out.push_str("  </metadata>\n");

    out.push_str("  <manifest>\n");
    out.push_str(&format!(
        "    <item id=\"toc\" href=\"{TOC_HTML_PATH}\" media-type=\"application/xhtml+xml\" />\n"
    ));
    out.push_str(&format!(
        "    <item id=\"ncx\" href=\"{TOC_NCX_PATH}\" media-type=\"application/x-dtbncx+xml\" />\n"
    ));
    for article in bundle.articles() {
        out.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\" />\n",
            xml_escape(&article.id),
            xml_escape(&article_href(article))
        ));
    }
    out.push_str(&format!(
        "    <item id=\"cover_img\" href=\"{COVER_PATH}\" media-type=\"image/jpeg\" />\n"
    ));
    out.push_str("  </manifest>\n");

    out.push_str("  <spine toc=\"ncx\">\n");
    out.push_str("    <itemref idref=\"toc\" />\n");
    for article in bundle.articles() {
        out.push_str(&format!(
            "    <itemref idref=\"{}\" />\n",
            xml_escape(&article.id)
        ));
    }
    out.push_str("  </spine>\n");

    out.push_str("  <guide>\n");
    out.push_str(&format!(
        "    <reference href=\"{TOC_HTML_PATH}\" type=\"toc\" title=\"Table of Contents\" />\n"
    ));
    out.push_str("  </guide>\n");
    out.push_str("</package>\n");
    out
}

pub fn render_toc_ncx(bundle: &Bundle) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str(
        "<!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\" \"http://www.daisy.org/z3986/2005/ncx-2005-1.dtd\">\n",
    );
    out.push_str(
        "<ncx xmlns:mbp=\"http://mobipocket.com/ns/mbp\" xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\" xml:lang=\"en-GB\">\n",
    );
    out.push_str("  <head>\n");
    out.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"urn:uuid:{}\" />\n",
        xml_escape(&bundle.id)
    ));
    out.push_str("    <meta name=\"dtb:depth\" content=\"2\" />\n");
    out.push_str("    <meta name=\"dtb:totalPageCount\" content=\"0\" />\n");
    out.push_str("    <meta name=\"dtb:maxPageNumber\" content=\"0\" />\n");
    out.push_str("  </head>\n");
    out.push_str("  <docTitle><text>");
    out.push_str(&xml_escape(&bundle.title));
    out.push_str("</text></docTitle>\n");
    out.push_str("  <navMap>\n");

    let mut play_order = 1;
    out.push_str(&format!(
        "    <navPoint class=\"periodical\" id=\"periodical\" playOrder=\"{play_order}\">\n"
    ));
    out.push_str(&format!(
        "      <navLabel><text>{TOC_LABEL}</text></navLabel>\n"
    ));
    out.push_str(&format!("      <content src=\"{TOC_HTML_PATH}\" />\n"));

    for (section_idx, section) in bundle.sections().iter().enumerate() {
        push_section_nav(&mut out, section, section_idx, &mut play_order);
    }

    out.push_str("    </navPoint>\n");
    out.push_str("  </navMap>\n");
    out.push_str("</ncx>\n");
    out
}

fn push_section_nav(
    out: &mut String,
    section: &Section,
    section_idx: usize,
    play_order: &mut usize,
) {
    let Some(first) = section.first_article() else {
        return;
    };

    *play_order += 1;
    out.push_str(&format!(
        "      <navPoint class=\"section\" id=\"section-{}\" playOrder=\"{}\">\n",
        section_idx + 1,
        play_order
    ));
    out.push_str("        <navLabel><text>");
    out.push_str(&xml_escape(&section.title));
    out.push_str("</text></navLabel>\n");
    out.push_str(&format!(
        "        <content src=\"{}#section1\" />\n",
        xml_escape(&article_href(first))
    ));

    for article in section.articles() {
        *play_order += 1;
        out.push_str(&format!(
            "        <navPoint class=\"article\" id=\"nav-{}\" playOrder=\"{}\">\n",
            xml_escape(&article.id),
            play_order
        ));
        out.push_str("          <navLabel><text>");
        out.push_str(&xml_escape(&article.title));
        out.push_str("</text></navLabel>\n");
        out.push_str(&format!(
            "          <content src=\"{}#title1\" />\n",
            xml_escape(&article_href(article))
        ));
        out.push_str(&format!(
            "          <mbp:meta name=\"description\">{}</mbp:meta>\n",
            xml_escape(&article.description)
        ));
        out.push_str("        </navPoint>\n");
    }

    out.push_str("      </navPoint>\n");
}

/// Human table of contents. It sits next to the article pages, so links are bare file names.
pub fn render_toc_html(bundle: &Bundle) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<html xmlns=\"http://www.w3.org/1999/xhtml\">\n");
    out.push_str("<head>\n");
    out.push_str(
        "  <meta http-equiv=\"Content-Type\" content=\"application/xhtml+xml; charset=utf-8\" />\n",
    );
    out.push_str(&format!("  <title>{TOC_LABEL}</title>\n"));
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str(&format!("  <h1>{TOC_LABEL}</h1>\n"));
    for section in bundle.sections() {
        if section.is_empty() {
            continue;
        }
        out.push_str(&format!("  <h4>{}</h4>\n", xml_escape(&section.title)));
        out.push_str("  <ul>\n");
        for article in section.articles() {
            out.push_str(&format!(
                "    <li><a href=\"{}\">{}</a></li>\n",
                xml_escape(&page_href(article)),
                xml_escape(&article.title)
            ));
        }
        out.push_str("  </ul>\n");
    }
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> Bundle {
        let mut alpha = Section::new("Alpha");
        alpha.push("One", "first line");
        alpha.push("Two <b>", "second & line");
        let mut beta = Section::new("Beta");
        beta.push("Uno", "primero");
        Bundle::assemble("Weekly", "zh-CN", vec![alpha, beta]).unwrap()
    }

    #[test]
    fn every_article_id_appears_once_per_artifact() {
        let bundle = sample_bundle();
        let opf = render_content_opf(&bundle);
        let ncx = render_toc_ncx(&bundle);
        let toc = render_toc_html(&bundle);

        for article in bundle.articles() {
            let item = format!("<item id=\"{}\" href=\"html/{}.html\"", article.id, article.id);
            let itemref = format!("<itemref idref=\"{}\" />", article.id);
            let nav = format!("<content src=\"html/{}.html#title1\" />", article.id);
            let link = format!("<a href=\"{}.html\">", article.id);
            assert_eq!(opf.matches(&item).count(), 1, "{item}");
            assert_eq!(opf.matches(&itemref).count(), 1, "{itemref}");
            assert_eq!(ncx.matches(&nav).count(), 1, "{nav}");
            assert_eq!(toc.matches(&link).count(), 1, "{link}");
        }
    }

    #[test]
    fn spine_starts_with_toc_then_follows_article_order() {
        let opf = render_content_opf(&sample_bundle());
        let refs: Vec<_> = opf
            .lines()
            .filter_map(|line| line.trim().strip_prefix("<itemref idref=\""))
            .map(|rest| rest.split('"').next().unwrap())
            .collect();
        assert_eq!(refs, ["toc", "Alpha-0", "Alpha-1", "Beta-0"]);
    }

    #[test]
    fn manifest_has_fixed_entries() {
        let opf = render_content_opf(&sample_bundle());
        assert!(opf.contains("href=\"html/toc.html\" media-type=\"application/xhtml+xml\""));
        assert!(opf.contains("href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\""));
        assert!(opf.contains("id=\"cover_img\" href=\"image/cover.jpg\""));
        assert!(opf.contains("<dc:language>zh-CN</dc:language>"));
    }

    #[test]
    fn section_nav_points_at_first_article_and_carries_descriptions() {
        let ncx = render_toc_ncx(&sample_bundle());
        assert!(ncx.contains("<content src=\"html/Alpha-0.html#section1\" />"));
        assert!(ncx.contains("<content src=\"html/Beta-0.html#section1\" />"));
        assert!(ncx.contains("<mbp:meta name=\"description\">second &amp; line</mbp:meta>"));
        assert!(ncx.contains("<text>Two &lt;b&gt;</text>"));
    }

    #[test]
    fn play_order_is_sequential() {
        let ncx = render_toc_ncx(&sample_bundle());
        let orders: Vec<usize> = ncx
            .match_indices("playOrder=\"")
            .map(|(idx, m)| {
                let rest = &ncx[idx + m.len()..];
                rest[..rest.find('"').unwrap()].parse().unwrap()
            })
            .collect();
        assert_eq!(orders, (1..=orders.len()).collect::<Vec<_>>());
        // periodical + 2 sections + 3 articles
        assert_eq!(orders.len(), 6);
    }

    #[test]
    fn toc_html_groups_articles_under_section_headings() {
        let toc = render_toc_html(&sample_bundle());
        let alpha = toc.find("<h4>Alpha</h4>").unwrap();
        let beta = toc.find("<h4>Beta</h4>").unwrap();
        let beta_link = toc.find("<a href=\"Beta-0.html\">Uno</a>").unwrap();
        assert!(alpha < beta && beta < beta_link);
    }

    #[test]
    fn reserved_characters_in_ids_are_percent_encoded() {
        let mut section = Section::new("C# Tales");
        section.push("One", "first line");
        let bundle = Bundle::assemble("Weekly", "en", vec![section]).unwrap();
        let article = bundle.articles().next().unwrap();
        assert_eq!(article.id, "C# Tales-0");

        let href = article_href(article);
        assert_eq!(href, "html/C%23%20Tales-0.html");
        assert!(render_content_opf(&bundle).contains("href=\"html/C%23%20Tales-0.html\""));
        assert!(render_toc_ncx(&bundle).contains("src=\"html/C%23%20Tales-0.html#title1\""));
        assert!(render_toc_html(&bundle).contains("<a href=\"C%23%20Tales-0.html\">"));

        let resolved = url::Url::parse("file:///out/content.opf")
            .unwrap()
            .join(&href)
            .unwrap();
        let written = crate::bundle::PageWriter::new(std::path::Path::new("/out"))
            .page_path(&article.id);
        assert_eq!(
            urlencoding::decode(resolved.path()).unwrap(),
            written.to_str().unwrap()
        );
    }

    #[test]
    fn article_page_is_deterministic() {
        let a = render_article_page("第一章", "<p>&#160;&#160;body</p>");
        let b = render_article_page("第一章", "<p>&#160;&#160;body</p>");
        assert_eq!(a, b);
        assert!(a.contains("<h1 id=\"title1\">"));
        assert!(a.contains("<div id=\"section1\"></div>"));
    }
}
