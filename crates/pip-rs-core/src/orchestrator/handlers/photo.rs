//! Label photos: identify the wine or explain what went wrong.

use crate::error::PipCoreError;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use log::{info, warn};
use pip_rs_protocol::{
    Action, ActionKind, Card, IntentKind, LabelAnalysis, ProcessResponse, WineCard, WineType,
};

/// Why a label could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LabelFailure {
    NotWine,
    Blurry,
    Lighting,
    Glare,
    Partial,
    WrongSide,
    Unreadable,
    LowConfidence,
    Unknown,
}

impl LabelFailure {
    /// Classify from the vision model's notes, then from confidence.
    pub(crate) fn classify(confidence: f32, notes: &str) -> Self {
        let notes = notes.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|word| notes.contains(word));
        if mentions(&["not a wine", "not wine"]) {
            LabelFailure::NotWine
        } else if mentions(&["blur"]) {
            LabelFailure::Blurry
        } else if mentions(&["dark", "lighting"]) {
            LabelFailure::Lighting
        } else if mentions(&["glare", "reflection"]) {
            LabelFailure::Glare
        } else if mentions(&["partial", "cropped"]) {
            LabelFailure::Partial
        } else if mentions(&["back label", "back of"]) {
            LabelFailure::WrongSide
        } else if confidence < 0.2 {
            LabelFailure::Unreadable
        } else if confidence < 0.5 {
            LabelFailure::LowConfidence
        } else {
            LabelFailure::Unknown
        }
    }

    fn guidance(self) -> &'static str {
        match self {
            LabelFailure::NotWine => {
                "That doesn't look like a wine label. I can only identify wine bottles, but you can also just tell me the wine's name."
            }
            LabelFailure::Blurry => {
                "The image is a bit blurry and I can't read the label clearly. Hold the camera steady and tap to focus on the label."
            }
            LabelFailure::Lighting => {
                "The lighting makes it hard to read the label. Try a brighter spot and keep shadows off the label."
            }
            LabelFailure::Glare => {
                "There's glare on the label making it hard to read. Angle the bottle slightly to cut the reflection."
            }
            LabelFailure::Partial => {
                "I can only see part of the label. Get the whole front label, with the wine name and producer, in the frame."
            }
            LabelFailure::WrongSide => {
                "This looks like the back label. Flip the bottle and send me the front!"
            }
            LabelFailure::Unreadable => {
                "I couldn't read the text on this label. Try better lighting, or just tell me the wine name and I'll help from there."
            }
            LabelFailure::LowConfidence => {
                "I'm not confident about this identification. Try a clearer photo of the front label, or type the wine name if you know it."
            }
            LabelFailure::Unknown => {
                "I had trouble with that image. Try a new photo of the main label, or simply tell me the wine name."
            }
        }
    }

    /// A retake will not help when the photo is not of a wine.
    fn can_retry(self) -> bool {
        self != LabelFailure::NotWine
    }
}

impl Orchestrator {
    pub(crate) async fn analyze_photo(
        &self,
        ctx: &TurnContext<'_>,
    ) -> Result<ProcessResponse, PipCoreError> {
        let Some(image) = ctx.attachments.iter().find(|attachment| attachment.is_image()) else {
            return Ok(reply::text(
                IntentKind::AnalyzePhoto,
                "Send me a photo of the front label and I'll try to identify the wine.",
            ));
        };
        let Some(vision) = self.vision.as_ref() else {
            return Ok(reply::text(
                IntentKind::AnalyzePhoto,
                "I can't read label photos right now. Tell me the wine's name and I'll take it from there.",
            ));
        };
        let analysis = match vision.analyze(&image.reference).await {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!("label analysis failed (error={})", err);
                return Ok(failure(LabelFailure::Unknown));
            }
        };
        let settings = &self.config.photo;
        let name = analysis
            .attributes
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let Some(name) = name.filter(|_| analysis.confidence >= settings.min_confidence) else {
            let notes = analysis.attributes.additional_info.as_deref().unwrap_or("");
            let kind = LabelFailure::classify(analysis.confidence, notes);
            info!(
                "label not identified (confidence={:.2}, failure={:?})",
                analysis.confidence, kind
            );
            return Ok(failure(kind));
        };

        let wine = self.catalog_find(name).await;
        info!(
            "label identified (name={}, confidence={:.2}, catalog_match={})",
            name,
            analysis.confidence,
            wine.is_some()
        );
        let mut card = label_card(name, &analysis);
        if let Some(wine) = &wine {
            card.wine_id = Some(wine.id.clone());
            card.price_usd = Some(wine.price_usd);
            if card.varietal.is_none() && !wine.varietal.is_empty() {
                card.varietal = Some(wine.varietal.clone());
            }
        }

        let mut text = format!("I found **{name}**");
        if let Some(producer) = analysis.attributes.producer.as_deref() {
            text.push_str(&format!(" by {producer}"));
        }
        if let Some(vintage) = analysis.attributes.vintage {
            text.push_str(&format!(" ({vintage})"));
        }
        text.push('!');
        if analysis.confidence < settings.confident_above {
            text.push_str(" I'm not completely sure, so let me know if that doesn't look right.");
        }
        text.push_str(" What would you like to do with it?");

        let mut response = reply::text(IntentKind::AnalyzePhoto, text);
        response.cards = vec![Card::Wine(card)];
        response.actions = vec![
            Action::new(ActionKind::AddCellar, "Add to cellar").with_value("add it to my cellar"),
            Action::new(ActionKind::Save, "Save for later").with_value("save it for later"),
            Action::new(ActionKind::TellMore, "Tell me more").with_value("tell me more about it"),
        ];
        Ok(response)
    }
}

fn failure(kind: LabelFailure) -> ProcessResponse {
    let mut text = kind.guidance().to_string();
    if kind.can_retry() {
        text.push_str(" Feel free to send another photo.");
    }
    reply::text(IntentKind::AnalyzePhoto, text)
}

fn label_card(name: &str, analysis: &LabelAnalysis) -> WineCard {
    let attributes = &analysis.attributes;
    WineCard {
        wine_id: None,
        name: name.to_string(),
        producer: attributes.producer.clone(),
        vintage: attributes.vintage,
        wine_type: attributes.wine_type.as_deref().and_then(WineType::parse),
        varietal: attributes.varietal.clone(),
        region: attributes.region.clone(),
        country: attributes.country.clone(),
        price_usd: None,
        explanation: None,
        relevance_score: Some(analysis.confidence.clamp(0.0, 1.0)),
        provenance: Vec::new(),
        is_in_cellar: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn notes_take_precedence_over_confidence() {
        assert_eq!(
            LabelFailure::classify(0.1, "Image is blurry"),
            LabelFailure::Blurry
        );
        assert_eq!(
            LabelFailure::classify(0.1, "this is not a wine bottle"),
            LabelFailure::NotWine
        );
        assert_eq!(
            LabelFailure::classify(0.4, "showing the back label"),
            LabelFailure::WrongSide
        );
    }

    #[test]
    fn confidence_decides_without_notes() {
        assert_eq!(LabelFailure::classify(0.1, ""), LabelFailure::Unreadable);
        assert_eq!(LabelFailure::classify(0.25, ""), LabelFailure::LowConfidence);
        assert_eq!(LabelFailure::classify(0.6, ""), LabelFailure::Unknown);
    }

    #[test]
    fn not_wine_does_not_invite_a_retake() {
        let response = failure(LabelFailure::NotWine);
        assert!(!response.response_text.contains("another photo"));
        assert!(failure(LabelFailure::Glare).response_text.contains("another photo"));
    }
}
