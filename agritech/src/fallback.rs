//! Canned farming advice used when the language model is unreachable.

const IRRIGATION: &str = "Pour optimiser l'irrigation de vos cultures, je vous recommande d'installer des capteurs d'humidité du sol et d'adopter un système d'irrigation goutte à goutte. Cette méthode peut réduire la consommation d'eau jusqu'à 60% par rapport aux méthodes traditionnelles. Arrosez tôt le matin pour minimiser l'évaporation et surveillez les prévisions météorologiques pour ajuster votre programme d'irrigation.";

const FERTILISATION: &str = "La fertilisation doit être basée sur une analyse de sol récente. Pour une approche durable, envisagez d'utiliser des engrais organiques comme le compost ou le fumier composté, qui améliorent la structure du sol tout en fournissant des nutriments. Appliquez les engrais au début de la saison de croissance et utilisez des cultures de couverture comme les légumineuses pour fixer naturellement l'azote dans le sol.";

const PESTS: &str = "Pour une gestion intégrée des ravageurs, commencez par l'identification précise du problème. Favorisez la biodiversité en plantant des fleurs qui attirent les insectes bénéfiques comme les coccinelles et les chrysopes. Utilisez des pièges à phéromones pour surveiller les populations de ravageurs. N'utilisez des pesticides biologiques qu'en dernier recours, et toujours de manière ciblée pour préserver les insectes utiles.";

const DISEASE: &str = "La prévention des maladies fongiques commence par une bonne circulation de l'air entre vos plants. Pratiquez la rotation des cultures pour éviter l'accumulation de pathogènes spécifiques dans le sol. Par temps humide, envisagez des applications préventives de purin d'ortie ou de bicarbonate de soude dilué pour les maladies fongiques légères. Retirez et détruisez (ne compostez pas) tout matériel végétal visiblement infecté.";

const PLANTING: &str = "Pour des semis réussis, assurez-vous que votre sol est bien préparé avec un bon drainage. Suivez les recommandations de profondeur de semis pour chaque espèce (généralement 2-3 fois la taille de la graine). Pour les transplantations, attendez les bonnes conditions météorologiques et arrosez abondamment après la plantation. Utilisez un calendrier de plantation adapté à votre région et aux particularités de votre microclimat.";

const SOIL: &str = "L'amélioration de la santé du sol est fondamentale pour une agriculture durable. Incorporez régulièrement de la matière organique, pratiquez le paillage pour protéger la surface du sol, et minimisez le travail du sol pour préserver sa structure. Envisagez des analyses de sol tous les 2-3 ans pour surveiller les niveaux de nutriments et le pH. Un sol sain devrait être meuble, avoir une bonne odeur de terre fraîche et abriter de nombreux vers de terre.";

pub const DEFAULT: &str = "Pour une agriculture durable et productive, je vous recommande d'observer attentivement votre exploitation et d'adapter vos pratiques aux conditions locales. La diversification des cultures, l'amélioration de la santé du sol et la gestion efficace de l'eau sont des principes fondamentaux qui s'appliquent à la plupart des situations agricoles. Si vous avez des questions plus spécifiques sur l'irrigation, la fertilisation, ou la gestion des ravageurs, n'hésitez pas à me les poser.";

/// Keyword groups in match order; the first group with a hit wins.
const TOPICS: [(&[&str], &str); 6] = [
    (&["irrigation", "arrosage"], IRRIGATION),
    (&["engrais", "fertilisation"], FERTILISATION),
    (&["ravageur", "insecte", "parasite"], PESTS),
    (&["maladie", "champignon"], DISEASE),
    (&["semis", "plantation"], PLANTING),
    (&["sol", "terre"], SOIL),
];

/// Picks a canned answer by case-insensitive keyword match.
#[must_use]
pub fn respond(question: &str) -> &'static str {
    let question = question.to_lowercase();
    TOPICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| question.contains(keyword)))
        .map_or(DEFAULT, |&(_, answer)| answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_topic_case_insensitively() {
        assert_eq!(respond("Quand faire l'ARROSAGE des tomates ?"), IRRIGATION);
        assert_eq!(respond("Quel engrais pour le blé ?"), FERTILISATION);
        assert_eq!(respond("Des insectes mangent mes choux"), PESTS);
        assert_eq!(respond("Un champignon sur les feuilles"), DISEASE);
        assert_eq!(respond("Date de semis du maïs"), PLANTING);
        assert_eq!(respond("Comment améliorer ma terre ?"), SOIL);
    }

    #[test]
    fn earlier_group_wins_when_several_match() {
        // "sol" and "irrigation" both appear; irrigation is checked first.
        assert_eq!(respond("irrigation d'un sol argileux"), IRRIGATION);
        assert_eq!(respond("maladie des semis"), DISEASE);
    }

    #[test]
    fn unknown_topic_gets_default() {
        assert_eq!(respond("Bonjour !"), DEFAULT);
        assert_eq!(respond("Bonjour !"), respond("Bonjour !"));
        assert_eq!(respond(""), DEFAULT);
    }
}
