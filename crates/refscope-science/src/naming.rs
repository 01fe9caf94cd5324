use refscope_core::{MetadataRecord, keys};

/// Maps a record to the filename its document should be saved under.
pub trait FilenameStrategy: Send + Sync {
    fn filename(&self, record: &MetadataRecord) -> String;
}

impl<F> FilenameStrategy for F
where
    F: Fn(&MetadataRecord) -> String + Send + Sync,
{
    fn filename(&self, record: &MetadataRecord) -> String {
        self(record)
    }
}

/// `<journal>.<volume>.<first page or article number>.pdf`, leaving out
/// whatever the record does not have.
///
/// The journal is the short container title (or the full one) with dots
/// and spaces removed; slashes in article numbers become dots.
#[derive(Debug, Clone, Copy, Default)]
pub struct JournalVolumePage;

impl FilenameStrategy for JournalVolumePage {
    fn filename(&self, record: &MetadataRecord) -> String {
        let mut parts = Vec::new();

        let journal = record
            .text(keys::CONTAINER_TITLE_SHORT)
            .or_else(|| record.text(keys::CONTAINER_TITLE))
            .map(|name| name.replace(['.', ' '], ""))
            .filter(|name| !name.is_empty());
        parts.extend(journal);
        parts.extend(record.text(keys::VOLUME));

        let first_page = record
            .text(keys::PAGE)
            .and_then(|page| page.split('-').next().map(|p| p.trim().to_string()))
            .filter(|page| !page.is_empty());
        let locator = first_page.or_else(|| {
            record
                .text(keys::ARTICLE_NUMBER)
                .map(|number| number.replace('/', "."))
        });
        parts.extend(locator);

        parts.push("pdf".to_string());
        parts.join(".")
    }
}
