//! Catalog pages as a Millennium 2007 server renders them, trimmed to the
//! markup the extractors look at.

pub const LOGIN_PAGE: &str = "<html><body>Patron record for Doe, Jane</body></html>";

pub fn loan_row(handle: &str, item: &str, title: &str, due: &str, extra: &str) -> String {
    format!(
        r#"<tr class="patFuncEntry">
<td align="left" class="patFuncMark"><input type="checkbox" name="{handle}" value="{item}" /></td>
<td align="left" class="patFuncTitle">{title}</td>
<td align="left" class="patFuncBarcode"> 31234000{item} </td>
<td align="left" class="patFuncStatus"> DUE {due} {extra}</td>
<td align="left" class="patFuncCallNo">FIC SMITH</td>
</tr>
"#
    )
}

pub fn loans_page() -> String {
    format!(
        "<table class=\"patFunc\">{}{}{}</table>",
        loan_row(
            "renew0",
            "i1000001",
            r#"<a href="/record=b2000001~S3">Nine stories / J.D. Salinger</a>"#,
            "06-15-09",
            r#"<span class="patFuncRenewCount">Renewed 3 times</span>"#
        ),
        loan_row(
            "renew1",
            "i1000002",
            r#"<a href="/record=b2000002~S3">Franny and Zooey</a>"#,
            "07-01-09",
            ""
        ),
        loan_row("renew2", "i1000003", "Borrowed from another library", "07-04-09", ""),
    )
}

pub fn renew_row(handle: &str, item: &str, due: &str, extra: &str) -> String {
    format!(
        r#"<tr class="patFuncEntry"><td class="patFuncMark"><input type="checkbox" name="{handle}" value="i{item}" /></td><td class="patFuncTitle">Title</td><td class="patFuncStatus">DUE {due}<span>{extra}</span></td><td class="patFuncCallNo">x</td></tr>
"#
    )
}

pub fn renew_all_page() -> String {
    format!(
        "<table>{}{}</table>",
        renew_row("renew0", "1000001", "06-29-09", "Renewed 3 times"),
        renew_row("renew1", "1000002", "07-15-09", ""),
    )
}

pub fn hold_row(handle: &str, title: &str, status: &str, pickup: &str) -> String {
    format!(
        r#"<tr class="patFuncEntry">
<td class="patFuncMark" align="center"><input type="checkbox" name="{handle}" /></td>
<td class="patFuncTitle">{title}</td>
<td class="patFuncStatus"> {status} </td>
<td class="patFuncPickup">{pickup}</td>
<td class="patFuncCancel">08-01-09</td>
</tr>
"#
    )
}

pub fn holds_page() -> String {
    format!(
        "<table class=\"patFunc\">{}{}{}</table>",
        hold_row(
            "cancelb2000001x00",
            r#"<a href="/record=b2000001~S3">Nine stories</a>"#,
            "2 of 5 holds",
            "Main Library"
        ),
        hold_row(
            "cancelb2000003x01",
            r#"<a href="/record=b2000003~S3">Raise high the roof beam</a>"#,
            "Ready. Must be picked up by 07-10-09",
            "Branch Library"
        ),
        hold_row("cancel@ill991", "Far away book", "", "Main Library"),
    )
}

pub const HOLD_SUCCESS_PAGE: &str =
    "<html><body><p>Your request for Nine stories was successful.</p></body></html>";

fn candidate_row(item: &str, location: &str, call_number: &str, status: &str) -> String {
    format!(
        r#"<tr class="bibItemsEntry">
<td><input type="radio" name="radio" value="{item}" /></td>
<td><!-- field 1 -->&nbsp;{location}</td>
<td><!-- field C -->&nbsp;{call_number}&nbsp; <!-- field v -->&nbsp;</td>
<td><!-- field % -->&nbsp;{status} </td>
</tr>
"#
    )
}

pub fn hold_choose_item_page() -> String {
    format!(
        r#"<html><body>
<form method="post">
<p>Choose one item from the list below</p>
<table class="bibItems">
{}{}{}</table>
<select name=loc>
<option value="mn">Main Library</option>
<option value="br">Branch Library</option>
<option value="">---</option>
</select>
</form>
</body></html>"#,
        candidate_row("i3000001", "Main Library Fiction", "FIC SALINGER", "AVAILABLE"),
        candidate_row("i3000002", "Branch Library Fiction", "FIC SALINGER", "DUE 07-01-09"),
        candidate_row("i3000003", "Main Library Stacks", "813.54 SAL", "AVAILABLE"),
    )
}

pub const SESSION_KEY_FINES_PAGE: &str = r#"<form name="pay"><input type="hidden" name="key" value="K-8842">
<table>
<tr><td><input type="checkbox" name="selectedFees" value="fee101" checked></td><td>Overdue: Nine stories </td><td>$12.50</td></tr>
<tr><td><input type="checkbox" name="selectedFees" value="fee102" checked></td><td>Lost card </td><td>$1.00</td></tr>
</table></form>"#;

pub const CHECKSUM_FINES_PAGE: &str = r#"<table>
<tr><td><input type="checkbox" name="charge1" checked> Overdue: Nine stories </td><td>x</td><td align="right">$12.50</td></tr>
</table>"#;

pub const CHECKSUM_CONFIRM_PAGE: &str =
    r#"<form><input type="hidden" name="cksum" value="9f2c1e"><p>Please confirm your payment</p></form>"#;

pub const PAYMENT_APPROVED_PAGE: &str = "<p>Your payment has been approved.</p>";

pub const PAYMENT_DECLINED_PAGE: &str = r#"<!--key="creditForm.error"/-->Card number invalid<br><span class="error">Payment failed</span>"#;

pub const ITEM_PAGE: &str = r#"<table><tr><td><a href="/record=b2000001">B20000012</a></td></tr></table>"#;

pub const SUMMARY_PAGE: &str = r#"<div class="bibDisplay">
<p>3 holds on first copy returned of 2 copies</p>
<table class="bibOrder"><tr class="bibOrderEntry"><td>2 copies being processed for Main Library.</td></tr></table>
</div>"#;

pub const HOLDINGS_PAGE: &str = r#"<table class="bibItems">
<tr class="bibItemsHeader"><th>LOCATION</th><th>CALL #</th><th>STATUS</th></tr>
<tr class="bibItemsEntry">
<td width="38%"><!-- field 1 -->&nbsp;<a href="/loc">Main Library Fiction</a></td>
<td width="38%"><!-- field C -->&nbsp;FIC SALINGER</td>
<td width="24%"><!-- field % -->&nbsp;AVAILABLE </td></tr>
<tr class="bibItemsEntry">
<td width="38%"><!-- field 1 -->&nbsp;Branch Library Fiction</td>
<td width="38%"><!-- field C -->&nbsp;FIC SALINGER</td>
<td width="24%"><!-- field % -->&nbsp;DUE 07-01-09 </td></tr>
</table>"#;

pub fn varfld(tag: &str, subfields: &[(&str, &str)]) -> String {
    let subfields: String = subfields
        .iter()
        .map(|(code, data)| {
            format!(
                "<MARCSUBFLD><SUBFIELDINDICATOR>{code}</SUBFIELDINDICATOR><SUBFIELDDATA>{data}</SUBFIELDDATA></MARCSUBFLD>"
            )
        })
        .collect();
    format!(
        "<VARFLD><HEADER><TAG>X</TAG></HEADER><MARCINFO><MARCTAG>{tag}</MARCTAG></MARCINFO>{subfields}</VARFLD>\n"
    )
}

pub fn xrecord(bcode3: &str) -> String {
    let fields = [
        varfld("020", &[("a", "0316769487 (pbk.)")]),
        varfld("100", &[("a", "Salinger, J. D."), ("d", "1919-2010.")]),
        varfld("245", &[("a", "Nine stories /"), ("c", "J.D. Salinger.")]),
        varfld("250", &[("a", "1st ed.")]),
        varfld("260", &[("a", "Boston :"), ("b", "Little, Brown,"), ("c", "c1953.")]),
        varfld("300", &[("a", "302 p. ;"), ("c", "21 cm.")]),
        varfld("650", &[("a", "Short stories")]),
    ]
    .concat();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<IIIRECORD>
<RECORDINFO><RECORDKEY>b2000001</RECORDKEY><CREATEDATE>03-14-98</CREATEDATE><LASTUPDATEDATE>06-01-09</LASTUPDATEDATE><PREVUPDATEDATE>01-02-05</PREVUPDATEDATE><REVISIONS>7</REVISIONS></RECORDINFO>
<TYPEINFO><BIBLIOGRAPHIC>
<FIXFLD><FIXNUMBER>24</FIXNUMBER><FIXLABEL>LANG</FIXLABEL><FIXVALUE>eng</FIXVALUE></FIXFLD>
<FIXFLD><FIXNUMBER>26</FIXNUMBER><FIXLABEL>LOCATION</FIXLABEL><FIXVALUE>mn</FIXVALUE></FIXFLD>
<FIXFLD><FIXNUMBER>30</FIXNUMBER><FIXLABEL>MAT TYPE</FIXLABEL><FIXVALUE>a</FIXVALUE></FIXFLD>
<FIXFLD><FIXNUMBER>31</FIXNUMBER><FIXLABEL>BCODE3</FIXLABEL><FIXVALUE>{bcode3}</FIXVALUE></FIXFLD>
</BIBLIOGRAPHIC></TYPEINFO>
{fields}</IIIRECORD>"#
    )
}

pub const NULL_RECORD: &str =
    "<IIIRECORD><NULLRECORD><MESSAGE>Record not found</MESSAGE></NULLRECORD></IIIRECORD>";

/// Patron file in the format `StaticPatronLookup::from_json_file` reads
pub const PATRON_FILE: &str = r#"[
  {
    "RECORDNUM": "1234567",
    "PBARCODE": "21234000123456",
    "PATRNNAME": "Doe, Jane",
    "PTYPE": "3",
    "MONEYOWED": "$12.50",
    "EXPDATE": "12-31-10"
  }
]"#;
