/// Taiwanese clearing codes shown next to the payout account on the profile
/// screen. Unknown codes resolve to `None` and are displayed as-is.
const BANKS: &[(&str, &str)] = &[
    ("004", "Bank of Taiwan"),
    ("005", "Land Bank of Taiwan"),
    ("006", "Taiwan Cooperative Bank"),
    ("007", "First Commercial Bank"),
    ("008", "Hua Nan Commercial Bank"),
    ("009", "Chang Hwa Bank"),
    ("010", "Hwatai Bank"),
    ("011", "Shanghai Commercial & Savings Bank"),
    ("012", "Taipei Fubon Bank"),
    ("013", "Cathay United Bank"),
    ("016", "Bank of Kaohsiung"),
    ("017", "Mega International Commercial Bank"),
    ("021", "Citibank Taiwan"),
    ("048", "O-Bank"),
    ("050", "Taiwan Business Bank"),
    ("052", "Standard Chartered Taiwan"),
    ("053", "Taichung Commercial Bank"),
    ("054", "King's Town Bank"),
    ("081", "HSBC Taiwan"),
    ("103", "Shin Kong Commercial Bank"),
    ("108", "Sunny Bank"),
    ("118", "Bank of Panhsin"),
    ("147", "COTA Commercial Bank"),
    ("700", "Chunghwa Post"),
    ("803", "Union Bank of Taiwan"),
    ("805", "Far Eastern International Bank"),
    ("806", "Yuanta Commercial Bank"),
    ("807", "Bank SinoPac"),
    ("808", "E.SUN Commercial Bank"),
    ("809", "KGI Bank"),
    ("810", "DBS Bank Taiwan"),
    ("812", "Taishin International Bank"),
    ("816", "EnTie Commercial Bank"),
    ("822", "CTBC Bank"),
];

pub fn bank_name(code: &str) -> Option<&'static str> {
    BANKS
        .iter()
        .find(|(bank_code, _)| *bank_code == code)
        .map(|(_, name)| *name)
}
