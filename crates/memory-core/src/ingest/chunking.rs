//! Paragraph splitting and greedy chunk concatenation

const MAX_CHUNK_LEN: usize = 500;

/// Split `content` into paragraphs on runs of two or more blank lines,
/// then greedily concatenate consecutive paragraphs into chunks of at
/// most `MAX_CHUNK_LEN` characters, never splitting a paragraph across
/// two chunks. A single paragraph longer than the limit becomes its own
/// oversized chunk.
pub fn chunk(content: &str) -> Vec<String> {
    let paragraphs = split_paragraphs(content);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        if current.is_empty() {
            current = paragraph;
            continue;
        }
        if current.len() + 2 + paragraph.len() <= MAX_CHUNK_LEN {
            current.push_str("\n\n");
            current.push_str(&paragraph);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = paragraph;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_paragraphs(content: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut blank_run = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if blank_run >= 2 && !current.is_empty() {
            paragraphs.push(std::mem::take(&mut current));
        } else if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        blank_run = 0;
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_blank_line_does_not_split_a_paragraph() {
        let chunks = chunk("first line\nsecond line");
        assert_eq!(chunks, vec!["first line\nsecond line".to_string()]);
    }

    #[test]
    fn two_blank_lines_split_into_paragraphs() {
        let paragraphs = split_paragraphs("one\n\n\ntwo");
        assert_eq!(paragraphs, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn small_paragraphs_are_concatenated_up_to_the_limit() {
        let content = "a".repeat(200) + "\n\n\n" + &"b".repeat(200) + "\n\n\n" + &"c".repeat(200);
        let chunks = chunk(&content);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].len() <= MAX_CHUNK_LEN);
    }

    #[test]
    fn oversized_paragraph_stands_alone() {
        let oversized = "x".repeat(MAX_CHUNK_LEN + 50);
        let chunks = chunk(&oversized);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), MAX_CHUNK_LEN + 50);
    }
}
