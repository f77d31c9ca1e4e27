use chrono::Local;

/// One harvested chapter; its page lives at `html/{id}.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Id of the `index`-th surviving article of a section.
///
/// Section titles are unique per run, so ids never collide across sources.
pub fn article_id(section_title: &str, index: usize) -> String {
    format!("{section_title}-{index}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    articles: Vec<Article>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            articles: Vec::new(),
        }
    }

    /// Id the next pushed article will get.
    pub fn next_article_id(&self) -> String {
        article_id(&self.title, self.articles.len())
    }

    /// Appends an article for `title`, numbering it after the ones already present.
    pub fn push(&mut self, title: impl Into<String>, description: impl Into<String>) -> &Article {
        let article = Article {
            id: self.next_article_id(),
            title: title.into(),
            description: description.into(),
        };
        self.articles.push(article);
        &self.articles[self.articles.len() - 1]
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn first_article(&self) -> Option<&Article> {
        self.articles.first()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }
}

/// The periodical produced by one run. Never holds an empty section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD`, local time.
    pub date: String,
    pub language: String,
    sections: Vec<Section>,
}

impl Bundle {
    /// Builds the bundle from the non-empty sections, or `None` if there are none.
    pub fn assemble(
        title: impl Into<String>,
        language: impl Into<String>,
        sections: Vec<Section>,
    ) -> Option<Self> {
        let sections: Vec<Section> = sections.into_iter().filter(|s| !s.is_empty()).collect();
        if sections.is_empty() {
            return None;
        }
        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            date: Local::now().format("%Y-%m-%d").to_string(),
            language: language.into(),
            sections,
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.sections.iter().flat_map(|section| section.articles.iter())
    }

    pub fn article_count(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }
}
