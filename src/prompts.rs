//! Prompt templates and model defaults for the two agents.
//!
//! A prompt change must come with a bump of [`DEFAULT_PROMPT_VERSION`]; the
//! tag is recorded on every result and keyed on by offline evaluation.
//!
//! The document text is embedded verbatim between `---` delimiter lines.

/// Model used by both agents unless overridden.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Provider used by both agents unless overridden.
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Provenance tag for the templates in this module.
pub const DEFAULT_PROMPT_VERSION: &str = "v1";

/// Output budget for a classification (a single flat JSON object).
pub const CLASSIFIER_MAX_TOKENS: usize = 1000;

/// Output budget for an invoice extraction (variable-length line items).
pub const INVOICE_MAX_TOKENS: usize = 2000;

/// System instruction for the document classifier.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are a document classification agent for a property development company.

Your job is to look at a document and determine:
1. What TYPE of document is it?
2. Key metadata you can extract from it

Document types:
- invoice: A bill requesting payment for goods/services
- progress_claim: A claim from a contractor for completed work stages
- contract: A formal agreement between parties
- variation: A change order or amendment to existing contract
- settlement: Property settlement statement
- unknown: Cannot determine

Confidence scoring:
- 0.9+ : Document explicitly states its type (e.g., "TAX INVOICE" header)
- 0.7-0.9 : Strongly implied by format and content
- 0.5-0.7 : Reasonable guess based on content
- Below 0.5 : Uncertain, might need human review

You MUST respond with valid JSON only, no other text. Use this exact structure:
{
    "document_type": "invoice",
    "confidence": 0.95,
    "vendor_name": "Smith Constructions Pty Ltd",
    "project_name": "Balmoral Estate",
    "document_date": "2024-03-15",
    "amount": 24750.00,
    "reasoning": "Document has TAX INVOICE header, ABN, GST breakdown..."
}

If a field cannot be determined, use null."#;

/// System instruction for the invoice field extractor.
pub const INVOICE_SYSTEM_PROMPT: &str = r#"You are an invoice data extraction agent for a property development company.

Extract all invoice details into structured JSON. Be precise with numbers and dates.

ABN format: XX XXX XXX XXX (Australian Business Number)
Date format: YYYY-MM-DD
Currency: numeric only, no symbols (e.g., 1500.00 not $1,500.00)

You MUST respond with valid JSON only, no other text:
{
    "invoice_number": "INV-2024-001",
    "vendor_name": "Smith Constructions Pty Ltd",
    "vendor_abn": "12 345 678 901",
    "invoice_date": "2024-03-15",
    "due_date": "2024-03-29",
    "project_reference": "Balmoral Estate - Lot 42",
    "description": "Concrete slab pour and related works",
    "line_items": [
        {"description": "Concrete slab pour", "quantity": 1, "unit_price": 15000.00, "amount": 15000.00}
    ],
    "subtotal": 22000.00,
    "gst_amount": 2200.00,
    "total_inc_gst": 24200.00,
    "payment_terms": "14 days"
}

Use null for any field that cannot be determined from the document."#;

/// Build the classifier's user message around the document text.
pub fn classifier_user_message(document_text: &str) -> String {
    format!(
        "Classify this document:\n\n---\n{}\n---\n\nRespond with JSON only.",
        document_text
    )
}

/// Build the invoice extractor's user message around the document text.
pub fn invoice_user_message(document_text: &str) -> String {
    format!(
        "Extract invoice data:\n\n---\n{}\n---\n\nRespond with JSON only.",
        document_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::DocumentType;

    #[test]
    fn classifier_prompt_lists_every_type() {
        for t in DocumentType::ALL {
            assert!(
                CLASSIFIER_SYSTEM_PROMPT.contains(&format!("- {}:", t.as_str())),
                "prompt is missing {t}"
            );
        }
    }

    #[test]
    fn invoice_prompt_states_formats() {
        assert!(INVOICE_SYSTEM_PROMPT.contains("XX XXX XXX XXX"));
        assert!(INVOICE_SYSTEM_PROMPT.contains("YYYY-MM-DD"));
        assert!(INVOICE_SYSTEM_PROMPT.contains("\"line_items\""));
    }

    #[test]
    fn user_messages_embed_text_between_delimiters() {
        let msg = classifier_user_message("TAX INVOICE\nABN 12 345 678 901");
        assert!(msg.contains("---\nTAX INVOICE\nABN 12 345 678 901\n---"));
        assert!(msg.starts_with("Classify this document:"));

        let msg = invoice_user_message("hello");
        assert!(msg.contains("---\nhello\n---"));
        assert!(msg.ends_with("Respond with JSON only."));
    }
}
