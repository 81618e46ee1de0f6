/// Default chunk budget in characters, sized so one chunk's rewrite stays
/// comfortably inside a single model call.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 8_000;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// The cut is placed after the sentence-terminal punctuation (`.`, `!`, `?`)
/// nearest to but not exceeding the limit. When a window contains no
/// terminator at all, the split falls back to a hard cut at the limit so
/// progress is always guaranteed.
///
/// Splitting is lossless: concatenating the returned chunks reproduces the
/// input byte for byte. `max_chars` counts characters, not bytes, so the
/// cuts are always on valid UTF-8 boundaries.
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
	let max_chars = max_chars.max(1);
	let mut chunks = Vec::new();
	let mut rest = text;

	while !rest.is_empty() {
		// Byte offset of the first char past the budget, if any.
		let limit = match rest.char_indices().nth(max_chars) {
			Some((byte_idx, _)) => byte_idx,
			None => {
				chunks.push(rest.to_string());
				break;
			}
		};

		let window = &rest[..limit];
		let cut = window
			.rfind(SENTENCE_TERMINATORS)
			.map(|idx| idx + 1) // terminators are one byte, cut lands after
			.unwrap_or(limit);

		chunks.push(rest[..cut].to_string());
		rest = &rest[cut..];
	}

	chunks
}

/// Reassemble processed chunk outputs in their original order.
///
/// Plain ordered concatenation: under identity processing this is the exact
/// left inverse of [`split`], and no chunk is ever dropped or duplicated.
pub fn merge<I, S>(chunks: I) -> String
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut out = String::new();
	for chunk in chunks {
		out.push_str(chunk.as_ref());
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_lossless(text: &str, max_chars: usize) {
		let chunks = split(text, max_chars);
		for chunk in &chunks {
			assert!(chunk.chars().count() <= max_chars, "chunk over budget: {} chars", chunk.chars().count());
		}
		assert_eq!(merge(&chunks), text);
	}

	#[test]
	fn short_text_is_one_chunk() {
		let chunks = split("One sentence.", 100);
		assert_eq!(chunks, vec!["One sentence.".to_string()]);
	}

	#[test]
	fn empty_text_yields_no_chunks() {
		assert!(split("", 10).is_empty());
		assert_eq!(merge(Vec::<String>::new()), "");
	}

	#[test]
	fn prefers_sentence_boundary() {
		let text = "First sentence. Second sentence. Third one here.";
		let chunks = split(text, 40);
		assert_eq!(chunks[0], "First sentence. Second sentence.");
		assert_eq!(merge(&chunks), text);
	}

	#[test]
	fn hard_cut_when_no_boundary_exists() {
		let text = "a".repeat(25);
		let chunks = split(&text, 10);
		assert_eq!(chunks.len(), 3);
		assert_eq!(chunks[0].len(), 10);
		assert_eq!(chunks[2].len(), 5);
		assert_eq!(merge(&chunks), text);
	}

	#[test]
	fn exclamation_and_question_marks_count() {
		let text = "Really?! Yes! Absolutely sure about it now.";
		let chunks = split(text, 20);
		assert!(chunks[0].ends_with('!'));
		assert_eq!(merge(&chunks), text);
	}

	#[test]
	fn multibyte_text_splits_on_char_boundaries() {
		let text = "Первое предложение. Второе предложение! Третье предложение? Хвост без точки";
		for limit in [1, 5, 19, 25, 40, 200] {
			assert_lossless(text, limit);
		}
	}

	#[test]
	fn split_is_lossless_and_bounded_for_varied_inputs() {
		let inputs = [
			"No punctuation at all just a very long run of words that keeps going",
			"Dots.Every.Where.In.This.One.",
			"   leading and trailing whitespace preserved.   ",
			"Mixed капуста text с переключением scripts. And back again! 日本語もある。",
		];
		for text in inputs {
			for limit in [1, 3, 8, 17, 64] {
				assert_lossless(text, limit);
			}
		}
	}

	#[test]
	fn merge_of_identity_processing_roundtrips_large_text() {
		let text = "Sentence number one is here. Sentence two follows! Does three ask a question? Four closes it out.".repeat(50);
		let chunks = split(&text, 80);
		assert!(chunks.len() > 1);
		// identity "processing"
		let processed: Vec<String> = chunks.iter().map(|c| c.clone()).collect();
		assert_eq!(merge(&processed), text);
	}

	#[test]
	fn zero_limit_still_makes_progress() {
		let chunks = split("abc", 0);
		assert_eq!(chunks.len(), 3);
		assert_eq!(merge(&chunks), "abc");
	}
}
