//! Tier report rendering.
//!
//! Turns the running scores into the user-facing report: hashtag emotion
//! keywords, an interpretive description of the band, the numeric index, and
//! per-tier advice. Formatting follows the report the chat widget renders as
//! a single message bubble.

use super::{Dimension, DimensionScores, Tier};

/// A dimension contributes a hashtag once it crosses this value.
const KEYWORD_THRESHOLD: f64 = 60.0;

/// Renders the personalized emotion report for a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator;

impl ReportGenerator {
    /// Build the full report text for the given running scores.
    pub fn render(&self, username: &str, scores: &DimensionScores) -> String {
        let composite = scores.composite();
        let tier = Tier::for_composite(composite);

        format!(
            "[{username}님의 연애 감정 리포트]\n\n\
             1️⃣ 주요 감정 키워드\n{keywords}\n\n\
             2️⃣ 감정 상태 분석\n\"{description}\"\n\n\
             3️⃣ 미련도 지수\n{emoji} **{index}% — {label}**\n\n\
             4️⃣ 개인화된 메시지\n{advice}\n\n\
             결과에 대해서 어떻게 생각해?",
            username = username,
            keywords = self.emotion_keywords(scores).join(" "),
            description = tier_description(tier),
            emoji = tier.emoji(),
            index = composite as i64,
            label = tier.label(),
            advice = tier_advice(tier),
        )
    }

    /// Hashtags for every dimension above the keyword threshold; growth tags
    /// when nothing crosses it.
    fn emotion_keywords(&self, scores: &DimensionScores) -> Vec<&'static str> {
        let mut keywords = Vec::new();
        for dim in Dimension::ALL {
            if scores.get(dim) > KEYWORD_THRESHOLD {
                keywords.push(match dim {
                    Dimension::Attachment => "#그리움",
                    Dimension::Regret => "#후회",
                    Dimension::Unresolved => "#미해결감",
                    Dimension::Comparison => "#비교",
                    Dimension::Avoidance => "#회피",
                });
            }
        }
        if keywords.is_empty() {
            keywords = vec!["#성장", "#이해", "#정리"];
        }
        keywords
    }
}

fn tier_description(tier: Tier) -> &'static str {
    match tier {
        Tier::Settled => {
            "이미 마음의 정리가 완전히 끝난 상태예요. 과거를 돌아보지 않고 새로운 시작을 \
             준비하고 있어요."
        }
        Tier::Afterglow => {
            "겉으로는 다 끝난 듯 보이지만, 그 시절의 따뜻함을 여전히 간직하고 있어요. '그 \
             사람'보다는 '그때의 나'를 그리워하는 상태예요."
        }
        Tier::Lingering => {
            "아직도 그 사람에 대한 감정이 남아있어요. 완전히 잊지는 못했지만, 새로운 시작을 \
             위한 준비는 되어있어요."
        }
        Tier::Strong => {
            "아직도 그 사람에 대한 강한 감정이 남아있어요. 새로운 관계를 시작하기에는 아직 \
             시간이 더 필요할 것 같아요."
        }
        Tier::Consuming => {
            "아직도 그 사람에 대한 매우 강한 감정이 남아있어요. 완전한 정리가 필요해 보여요."
        }
    }
}

fn tier_advice(tier: Tier) -> &'static str {
    match tier {
        Tier::Settled => {
            "과거를 아름답게 정리하고 새로운 시작을 준비하고 있는 모습이 정말 멋져요. 이제 \
             진짜 새로운 사랑을 만날 준비가 되어있어요!"
        }
        Tier::Afterglow => {
            "아직도 그 시절의 따뜻함을 간직하고 있지만, 이제는 '그 사람'보다는 '그때의 나'를 \
             그리워하고 있어요. 이는 정말 건강한 감정이에요!"
        }
        Tier::Lingering => {
            "아직도 그 사람에 대한 감정이 남아있지만, 이제는 새로운 시작을 위한 준비가 \
             되어있어요. 조금 더 시간을 갖고 천천히 나아가세요!"
        }
        Tier::Strong => {
            "아직도 그 사람에 대한 강한 감정이 남아있어요. 새로운 관계를 시작하기에는 아직 \
             시간이 더 필요할 것 같아요. 조금 더 기다려보세요!"
        }
        Tier::Consuming => {
            "아직도 그 사람에 대한 매우 강한 감정이 남아있어요. 완전한 정리가 필요해 보여요. \
             전문가의 도움을 받는 것도 좋은 방법이에요!"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_contains_tier_label_and_index() {
        let generator = ReportGenerator;
        let scores = DimensionScores {
            attachment: 50.0,
            regret: 85.0,
            unresolved: 50.0,
            comparison: 50.0,
            avoidance: 50.0,
        };
        let report = generator.render("지수", &scores);

        assert!(report.contains("지수님의 연애 감정 리포트"));
        assert!(report.contains("적당한 미련 단계"));
        assert!(report.contains("58%"));
        assert!(report.contains("🧡"));
    }

    #[test]
    fn test_report_ends_with_feedback_question() {
        let generator = ReportGenerator;
        let report = generator.render("지수", &DimensionScores::default());
        assert!(report.ends_with("결과에 대해서 어떻게 생각해?"));
    }

    #[test]
    fn test_keywords_above_threshold() {
        let generator = ReportGenerator;
        let scores = DimensionScores {
            attachment: 85.0,
            regret: 61.0,
            unresolved: 50.0,
            comparison: 50.0,
            avoidance: 50.0,
        };
        let keywords = generator.emotion_keywords(&scores);
        assert_eq!(keywords, vec!["#그리움", "#후회"]);
    }

    #[test]
    fn test_keywords_fall_back_to_growth_tags() {
        let generator = ReportGenerator;
        let keywords = generator.emotion_keywords(&DimensionScores::default());
        assert_eq!(keywords, vec!["#성장", "#이해", "#정리"]);
    }

    #[test]
    fn test_report_at_each_tier() {
        let generator = ReportGenerator;
        for (value, label) in [
            (10.0, "완전 정리 단계"),
            (30.0, "잔잔한 여운 단계"),
            (50.0, "적당한 미련 단계"),
            (70.0, "강한 미련 단계"),
            (95.0, "매우 강한 미련 단계"),
        ] {
            let scores = DimensionScores {
                attachment: value,
                regret: value,
                unresolved: value,
                comparison: value,
                avoidance: value,
            };
            let report = generator.render("민수", &scores);
            assert!(report.contains(label), "missing {} at {}", label, value);
        }
    }
}
